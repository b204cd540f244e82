use shop_common::Vnd;
use thiserror::Error;

use crate::{db_types::OrderId, helpers::memo_names_order};

/// A bank transfer as reported by the payment provider's transaction search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTransfer {
    /// The provider's own id for the transfer.
    pub reference: String,
    pub amount: Vnd,
    /// Some provider integrations report a status flag (`PAID`), others only an amount.
    pub status: Option<String>,
    /// The free-text memo of the transfer.
    pub content: String,
}

impl ProviderTransfer {
    /// A transfer confirms payment if the provider flags it as `PAID`, or if it moved a positive amount.
    pub fn confirms_payment(&self) -> bool {
        let flagged = self.status.as_deref().map(|s| s.trim().eq_ignore_ascii_case("paid")).unwrap_or(false);
        flagged || self.amount.is_positive()
    }

    /// Provider searches match memos loosely, so the memo must carry `order_id` as a whole token.
    pub fn names_order(&self, order_id: &OrderId) -> bool {
        memo_names_order(&self.content, order_id)
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("The payment provider could not be reached. {0}")]
    Unreachable(String),
    #[error("The payment provider rejected our credentials.")]
    Unauthorized,
    #[error("The payment provider returned an unexpected response. {0}")]
    InvalidResponse(String),
}

/// The seam to the external bank-transfer provider.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// Searches the provider's transactions for a transfer whose memo carries `order_id`. Returns the most recent
    /// match, or `None` if the provider has not seen a transfer for the order.
    async fn search_transfer(&self, order_id: &OrderId) -> Result<Option<ProviderTransfer>, PaymentProviderError>;
}
