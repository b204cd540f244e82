use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Vnd;

use crate::db_types::{Order, OrderId, OrderLineItem, OrderStatusType, PaymentMethod, Product, ShippingAddress};

/// The name shown for line items whose product has been removed from the catalog.
pub const MISSING_PRODUCT_NAME: &str = "Product no longer exists";

/// The caller of an engine operation, as established by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn user<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), is_admin: false }
    }

    pub fn admin<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), is_admin: true }
    }

    /// Admins may access every order, users only their own.
    pub fn can_access(&self, order: &Order) -> bool {
        self.is_admin || order.user_id == self.user_id
    }
}

//--------------------------------------   Order creation      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    /// The product's catalog code.
    pub product: String,
    pub quantity: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    /// A client-chosen order reference. Resubmitting a request with the same reference returns the existing order.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub products: Vec<OrderItemRequest>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub shipping_fee: Option<Vnd>,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl NewOrderRequest {
    pub fn new(products: Vec<OrderItemRequest>) -> Self {
        Self {
            order_id: None,
            products,
            shipping_address: ShippingAddress::default(),
            shipping_method: None,
            shipping_fee: None,
            voucher_code: None,
            payment_method: PaymentMethod::default(),
        }
    }

    pub fn with_voucher<S: Into<String>>(mut self, code: S) -> Self {
        self.voucher_code = Some(code.into());
        self
    }

    pub fn with_shipping_fee(mut self, fee: Vnd) -> Self {
        self.shipping_fee = Some(fee);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// The voucher code, trimmed and upper-cased, or `None` if it is absent or blank.
    pub fn normalized_voucher_code(&self) -> Option<String> {
        self.voucher_code.as_deref().map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty())
    }
}

/// The result of an order creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacement {
    pub order: OrderView,
    /// `false` when a request carrying an existing order reference was replayed.
    pub created: bool,
}

//--------------------------------------     Order views       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: String,
    pub price: Vnd,
    pub image: String,
}

impl ProductSummary {
    pub fn missing() -> Self {
        Self { id: None, code: None, name: MISSING_PRODUCT_NAME.to_string(), price: Vnd::from(0), image: String::new() }
    }

    pub fn is_missing(&self) -> bool {
        self.id.is_none()
    }
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id),
            code: Some(product.code.clone()),
            name: product.name.clone(),
            price: product.price,
            image: product.thumbnail.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub product: ProductSummary,
    pub quantity: i64,
    /// The unit price paid, as snapshotted when the order was created.
    pub price: Vnd,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl LineItemView {
    pub fn new(item: &OrderLineItem, product: ProductSummary) -> Self {
        Self { product, quantity: item.quantity, price: item.unit_price, color: item.color.clone(), size: item.size.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: OrderId,
    pub user_id: String,
    pub products: Vec<LineItemView>,
    pub subtotal: Vnd,
    pub discount_amount: Vnd,
    pub shipping_fee: Vnd,
    pub total_price: Vnd,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub shipping_method: String,
    pub voucher_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    pub fn new(order: Order, products: Vec<LineItemView>) -> Self {
        Self {
            order_id: order.order_id,
            user_id: order.user_id,
            products,
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            shipping_fee: order.shipping_fee,
            total_price: order.total_price,
            status: order.status,
            payment_method: order.payment_method,
            shipping_method: order.shipping_method,
            voucher_code: order.voucher_code,
            shipping_address: order.shipping_address,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
}

//--------------------------------------     Order search      ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub user_id: Option<String>,
    pub status: Option<Vec<OrderStatusType>>,
    pub payment_method: Option<PaymentMethod>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Zero-based index of the first result to return.
    #[serde(rename = "_start")]
    pub start: Option<i64>,
    /// Index one past the last result to return.
    #[serde(rename = "_end")]
    pub end: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_range(mut self, start: i64, end: i64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// The SQL `(LIMIT, OFFSET)` implied by `_start` and `_end`, if any.
    pub fn limit_offset(&self) -> Option<(i64, i64)> {
        let offset = self.start.unwrap_or(0).max(0);
        self.end.map(|end| ((end - offset).max(0), offset)).or_else(|| self.start.map(|_| (-1, offset)))
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.payment_method.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(method) = &self.payment_method {
            write!(f, "payment_method: {method}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some((limit, offset)) = self.limit_offset() {
            write!(f, "limit {limit} offset {offset}.")?;
        }
        Ok(())
    }
}
