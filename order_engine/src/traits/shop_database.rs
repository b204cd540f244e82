use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, VoucherRedemption},
    traits::{CartStore, Catalog, OrderStore, VoucherStore},
    ErrorKind,
};

/// The full backend contract for the order engine.
///
/// Besides the single-table stores, a backend provides the two operations that must touch several tables atomically.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: Clone + Catalog + VoucherStore + OrderStore + CartStore {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a new order in a single transaction:
    /// * the order row and its line items are inserted,
    /// * each line item's stock is decremented with a guarded update (products that no longer exist are skipped),
    /// * if `voucher` is given, the claim's usage count and the voucher's global used count are incremented, each
    ///   guarded by its cap.
    ///
    /// If any guard fails, the whole transaction is rolled back and the matching error is returned
    /// ([`StoreError::InsufficientStock`], [`StoreError::VoucherUserLimitReached`] or
    /// [`StoreError::VoucherGloballyExhausted`]). A clash on the order reference gives [`StoreError::UniqueViolation`].
    async fn place_order(&self, order: NewOrder, voucher: Option<VoucherRedemption>) -> Result<Order, StoreError>;

    /// Cancels the order if its status is one of `from`, and returns its stock to the catalog in the same transaction.
    /// Items whose product has since been deleted are skipped.
    ///
    /// Returns `None` if the order does not exist or was not in one of the `from` states.
    async fn cancel_order(&self, order_id: &OrderId, from: &[OrderStatusType]) -> Result<Option<Order>, StoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("A record with the same unique key already exists. {0}")]
    UniqueViolation(String),
    #[error("Not enough stock for {product}: requested {requested}, only {available} available")]
    InsufficientStock { product: String, requested: i64, available: i64 },
    #[error("You have already used voucher {0} the maximum number of times")]
    VoucherUserLimitReached(String),
    #[error("Voucher {0} has been fully redeemed")]
    VoucherGloballyExhausted(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The update request did not contain any changes")]
    NoChanges,
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) => ErrorKind::Server,
            Self::UniqueViolation(_) | Self::NoChanges => ErrorKind::Validation,
            Self::InsufficientStock { .. } |
            Self::VoucherUserLimitReached(_) |
            Self::VoucherGloballyExhausted(_) => ErrorKind::StateConflict,
            Self::OrderNotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.message().to_string())
            },
            _ => StoreError::DatabaseError(e.to_string()),
        }
    }
}
