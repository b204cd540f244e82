//! Data types shared by the order engine API and its storage backends.
//!
//! These types map directly onto database rows (via `sqlx::FromRow`) or onto the write-side records handed to a
//! backend. The request/response objects used by the public API live in [`crate::order_objects`].
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Vnd;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      OrderId        ---------------------------------------------------------
/// The human-readable order reference, e.g. `ORDER1700000000000`. It is the only link between a bank transfer memo
/// and an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Created, no online payment expected yet (e.g. cash on delivery).
    Pending,
    /// A SePay QR has been issued and the transfer has not been seen yet.
    AwaitingPayment,
    /// Staff confirmed a cash-on-delivery order.
    Confirmed,
    Paid,
    Processing,
    Shipped,
    /// Terminal.
    Delivered,
    /// Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 8] = [
        Self::Pending,
        Self::AwaitingPayment,
        Self::Confirmed,
        Self::Paid,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Confirmed => "confirmed",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// The statuses from which an order may legally move to `self`. An empty slice means nothing can transition
    /// into this status (it is only ever assigned on creation).
    pub fn legal_sources(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Pending | AwaitingPayment => &[],
            Confirmed => &[Pending],
            Paid => &[Pending, AwaitingPayment],
            Processing => &[Paid, Confirmed],
            Shipped => &[Paid, Processing],
            Delivered => &[Shipped],
            Cancelled => &[Pending, Paid],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatusType) -> bool {
        target.legal_sources().contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// True while a payment confirmation can still move the order to `Paid`.
    pub fn is_awaiting_funds(&self) -> bool {
        matches!(self, Self::Pending | Self::AwaitingPayment)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s.trim().to_ascii_lowercase())
            .copied()
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank transfer via a SePay/VietQR code.
    #[default]
    Seepay,
    /// Cash on delivery.
    Cod,
}

impl PaymentMethod {
    pub fn initial_status(&self) -> OrderStatusType {
        match self {
            Self::Seepay => OrderStatusType::AwaitingPayment,
            Self::Cod => OrderStatusType::Pending,
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seepay => f.write_str("seepay"),
            Self::Cod => f.write_str("cod"),
        }
    }
}

//--------------------------------------   ShippingAddress     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address_line: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub note: Option<String>,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: String,
    pub subtotal: Vnd,
    pub discount_amount: Vnd,
    pub shipping_fee: Vnd,
    pub total_price: Vnd,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub shipping_method: String,
    pub voucher_code: Option<String>,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    #[serde(skip)]
    pub last_provider_check_at: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderLineItem>,
}

impl Order {
    /// The total implied by the line items, discount and shipping fee. Equal to `total_price` for every order the
    /// engine creates.
    pub fn computed_total(&self) -> Vnd {
        let subtotal: Vnd = self.items.iter().map(OrderLineItem::line_total).sum();
        subtotal - self.discount_amount + self.shipping_fee
    }

    pub fn customer_name(&self) -> &str {
        self.shipping_address.full_name.as_str()
    }
}

/// A line item as persisted. Prices are snapshots taken when the order was created and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub id: i64,
    #[serde(skip)]
    pub order_row_id: i64,
    /// Internal catalog identity; authoritative for joins.
    pub product_id: i64,
    pub product_code: String,
    pub product_name: String,
    pub product_image: String,
    pub unit_price: Vnd,
    pub cost_price: Vnd,
    pub quantity: i64,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl OrderLineItem {
    pub fn line_total(&self) -> Vnd {
        self.unit_price * self.quantity
    }
}

/// A line item produced by the order assembler, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_id: i64,
    pub product_code: String,
    pub product_name: String,
    pub product_image: String,
    pub unit_price: Vnd,
    pub cost_price: Vnd,
    pub quantity: i64,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl NewLineItem {
    pub fn line_total(&self) -> Vnd {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: String,
    pub items: Vec<NewLineItem>,
    pub subtotal: Vnd,
    pub discount_amount: Vnd,
    pub shipping_fee: Vnd,
    pub total_price: Vnd,
    pub payment_method: PaymentMethod,
    pub shipping_method: String,
    pub voucher_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn initial_status(&self) -> OrderStatusType {
        self.payment_method.initial_status()
    }
}

//--------------------------------------       Catalog         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub brand: String,
    pub price: Vnd,
    pub cost_price: Vnd,
    pub total: i64,
    pub sold: i64,
    pub thumbnail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units still available at the global level.
    pub fn available(&self) -> i64 {
        (self.total - self.sold).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub color: String,
    pub size: String,
    pub quantity: i64,
    pub sold: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    pub price: Vnd,
    #[serde(default)]
    pub cost_price: Vnd,
    pub total: i64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(code: S, name: S, price: Vnd, total: i64) -> Self {
        Self { code: code.into(), name: name.into(), price, total, ..Default::default() }
    }

    pub fn with_cost_price(mut self, cost_price: Vnd) -> Self {
        self.cost_price = cost_price;
        self
    }

    pub fn with_variant<S: Into<String>>(mut self, color: S, size: S, quantity: i64) -> Self {
        self.variants.push(NewVariant { color: color.into(), size: size.into(), quantity });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariant {
    pub color: String,
    pub size: String,
    pub quantity: i64,
}

//--------------------------------------       Stock           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Units leave the shelf: `sold` goes up, the variant's `quantity` goes down.
    Sale,
    /// A sale is reversed, e.g. on cancellation.
    Restock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i64,
    pub quantity: i64,
    pub color: Option<String>,
    pub size: Option<String>,
    pub direction: StockDirection,
}

impl StockAdjustment {
    pub fn sale(item: &NewLineItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            color: item.color.clone(),
            size: item.size.clone(),
            direction: StockDirection::Sale,
        }
    }

    pub fn restock(item: &OrderLineItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            color: item.color.clone(),
            size: item.size.clone(),
            direction: StockDirection::Restock,
        }
    }

    /// The (color, size) pair, if both are present.
    pub fn variant_key(&self) -> Option<(&str, &str)> {
        match (self.color.as_deref(), self.size.as_deref()) {
            (Some(c), Some(s)) if !c.is_empty() && !s.is_empty() => Some((c, s)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    Applied { variant_tracked: bool },
    /// The product was deleted from the catalog. Nothing was changed.
    ProductMissing,
    /// The guarded update matched no row; `available` is what the catalog held at the time.
    Insufficient { available: i64 },
}

//--------------------------------------      Vouchers         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentage => f.write_str("percentage"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// The usage-cap contract for vouchers: a stored cap of `0` means unlimited, a positive value is a hard cap, and a
/// missing (legacy) value means `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageCap {
    Unlimited,
    Limited(i64),
}

impl UsageCap {
    pub fn from_stored(value: Option<i64>) -> Self {
        match value {
            None => Self::Limited(1),
            Some(v) if v <= 0 => Self::Unlimited,
            Some(v) => Self::Limited(v),
        }
    }

    pub fn allows(&self, used: i64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(cap) => used < *cap,
        }
    }

    /// The representation used by guarded SQL updates, where `0` disables the guard.
    pub fn as_sql_cap(&self) -> i64 {
        match self {
            Self::Unlimited => 0,
            Self::Limited(cap) => *cap,
        }
    }
}

impl Display for UsageCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Limited(cap) => write!(f, "{cap}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_order_amount: Vnd,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_uses: Option<i64>,
    pub max_uses_per_user: Option<i64>,
    pub used_count: i64,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn global_cap(&self) -> UsageCap {
        UsageCap::from_stored(self.max_uses)
    }

    pub fn per_user_cap(&self) -> UsageCap {
        UsageCap::from_stored(self.max_uses_per_user)
    }

    /// Active and `now` lies within `[valid_from, valid_until]`.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= now && now <= self.valid_until
    }

    /// The discount for the given subtotal, clamped to `[0, subtotal]`.
    pub fn discount_for(&self, subtotal: Vnd) -> Vnd {
        let raw = match self.discount_type {
            DiscountType::Percentage => Vnd::from(subtotal.value().saturating_mul(self.value) / 100),
            DiscountType::Fixed => Vnd::from(self.value),
        };
        raw.clamp_to(Vnd::from(0), subtotal.max(Vnd::from(0)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVoucher {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: i64,
    #[serde(default)]
    pub min_order_amount: Vnd,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_uses: Option<i64>,
    pub max_uses_per_user: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A partial update to a voucher. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: Option<DiscountType>,
    pub value: Option<i64>,
    pub min_order_amount: Option<Vnd>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
    pub max_uses_per_user: Option<i64>,
    pub is_active: Option<bool>,
}

impl VoucherUpdate {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() &&
            self.name.is_none() &&
            self.description.is_none() &&
            self.discount_type.is_none() &&
            self.value.is_none() &&
            self.min_order_amount.is_none() &&
            self.valid_from.is_none() &&
            self.valid_until.is_none() &&
            self.max_uses.is_none() &&
            self.max_uses_per_user.is_none() &&
            self.is_active.is_none()
    }
}

/// A user's claim on a voucher.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoucher {
    pub id: i64,
    pub user_id: String,
    pub voucher_id: i64,
    pub claimed_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub usage_count: i64,
    pub order_id: Option<String>,
}

impl UserVoucher {
    /// Prior uses of this claim. Older records set `used_at` without counting, and those count as one use.
    pub fn effective_usage(&self) -> i64 {
        if self.usage_count == 0 && self.used_at.is_some() {
            1
        } else {
            self.usage_count
        }
    }
}

/// Everything `place_order` needs to consume a voucher atomically alongside the order insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherRedemption {
    pub voucher_id: i64,
    pub voucher_code: String,
    pub claim_id: i64,
    pub global_cap: UsageCap,
    pub per_user_cap: UsageCap,
}

//--------------------------------------        Cart           ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: i64,
    pub user_id: String,
    pub product_code: String,
    pub color: String,
    pub size: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub user_id: String,
    pub product_code: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i64,
}

impl NewCartItem {
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_code.clone(), self.color.clone(), self.size.clone())
    }
}

/// Identifies a cart line. Missing colors and sizes are stored as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_code: String,
    pub color: String,
    pub size: String,
}

impl CartKey {
    pub fn new<S: Into<String>>(product_code: S, color: Option<String>, size: Option<String>) -> Self {
        Self { product_code: product_code.into(), color: color.unwrap_or_default(), size: size.unwrap_or_default() }
    }
}

//--------------------------------------        Roles          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}
