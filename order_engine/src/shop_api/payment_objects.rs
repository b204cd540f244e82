use serde::{Deserialize, Serialize};
use shop_common::Vnd;

use crate::db_types::{Order, OrderId, OrderStatusType};

/// The name reported for orders placed without a recipient name.
pub const DEFAULT_CUSTOMER_NAME: &str = "Khách hàng";

/// The answer to a payment-status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub order_id: OrderId,
    pub name: String,
    pub amount: Vnd,
    pub status: OrderStatusType,
}

impl From<&Order> for PaymentStatus {
    fn from(order: &Order) -> Self {
        let name = match order.customer_name().trim() {
            "" => DEFAULT_CUSTOMER_NAME.to_string(),
            name => name.to_string(),
        };
        Self { order_id: order.order_id.clone(), name, amount: order.total_price, status: order.status }
    }
}

/// A provider-pushed notification of an incoming bank transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferNotice {
    /// The provider's id for the transfer, if it sent one.
    pub reference: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub amount: Vnd,
}

impl TransferNotice {
    /// The transfer memo. `content` takes precedence; `description` is used when `content` is missing or blank.
    pub fn memo(&self) -> &str {
        match self.content.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => self.description.as_deref().unwrap_or_default(),
        }
    }
}

/// What a webhook delivery did to its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// This delivery moved the order to `paid`.
    MarkedPaid(Order),
    /// The order was already paid (or paid concurrently by the other channel). Nothing changed.
    AlreadyPaid(Order),
    /// The transfer did not confirm payment, or the order can no longer accept payment.
    Ignored(Order),
}

impl WebhookOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::MarkedPaid(o) | Self::AlreadyPaid(o) | Self::Ignored(o) => o,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MarkedPaid(o) => format!("Order {} has been marked as paid", o.order_id),
            Self::AlreadyPaid(o) => format!("Order {} was already paid", o.order_id),
            Self::Ignored(o) => format!("Order {} is {}. No changes were made", o.order_id, o.status),
        }
    }
}
