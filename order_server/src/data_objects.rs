use std::fmt::Display;

use chrono::{DateTime, Utc};
use order_engine::{
    db_types::{Order, OrderId, OrderStatusType, PaymentMethod},
    order_objects::{OrderPlacement, OrderQueryFilter, OrderView},
    shop_api::order_flow_api::amount_due,
};
use sepay_tools::vietqr_url;
use serde::{Deserialize, Serialize};
use shop_common::Vnd;

use crate::{config::ServerOptions, errors::ServerError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The `{message}` body returned to the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    pub order_id: OrderId,
}

/// Everything a customer needs to pay a SePay order by bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub order_id: OrderId,
    pub amount: Vnd,
    pub bank_code: String,
    pub account_no: String,
    /// The transfer memo. SePay matches the transfer to the order by this text.
    pub content: String,
    pub qr_url: String,
}

impl PaymentInstructions {
    /// `None` unless the order is a SePay order still waiting for its transfer.
    pub fn for_order(order: &Order, options: &ServerOptions) -> Option<Self> {
        let amount = amount_due(order)?;
        Some(Self::new(&order.order_id, amount, options))
    }

    pub fn for_view(order: &OrderView, options: &ServerOptions) -> Option<Self> {
        let awaiting = order.payment_method == PaymentMethod::Seepay && order.status.is_awaiting_funds();
        awaiting.then(|| Self::new(&order.order_id, order.total_price, options))
    }

    fn new(order_id: &OrderId, amount: Vnd, options: &ServerOptions) -> Self {
        let reference = order_id.as_str();
        Self {
            order_id: order_id.clone(),
            amount,
            bank_code: options.bank_code.clone(),
            account_no: options.account_no.clone(),
            content: reference.to_string(),
            qr_url: vietqr_url(&options.bank_code, &options.account_no, amount, reference),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    #[serde(flatten)]
    pub placement: OrderPlacement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInstructions>,
}

/// Query parameters for the order search. Statuses are given as a comma-separated list, e.g.
/// `?status=pending,awaiting_payment&_start=0&_end=20`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearchParams {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(rename = "_start")]
    pub start: Option<i64>,
    #[serde(rename = "_end")]
    pub end: Option<i64>,
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let status = match params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(list) => Some(
                list.split(',')
                    .map(|s| s.trim().parse::<OrderStatusType>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?,
            ),
            None => None,
        };
        Ok(OrderQueryFilter {
            user_id: params.user_id,
            status,
            payment_method: params.payment_method,
            since: params.since,
            until: params.until,
            start: params.start,
            end: params.end,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVoucherRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateVoucherRequest {
    pub code: String,
    pub subtotal: Vnd,
}
