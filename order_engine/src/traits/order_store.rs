use crate::{
    db_types::{Order, OrderId, OrderStatusType},
    order_objects::OrderQueryFilter,
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// Fetches the order, including its line items.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders matching the filter, newest first, each including its line items.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;

    /// Moves the order to `to`, but only if its current status is one of `from`. This is a single conditional update,
    /// so of several concurrent callers at most one sees `Some`.
    ///
    /// Returns the updated order, or `None` if the order does not exist or was not in one of the `from` states.
    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<Option<Order>, StoreError>;

    /// Claims the right to query the payment provider for this order. Succeeds (returns `true`) if no check has been
    /// claimed within the last `cooldown_ms` milliseconds, recording `now_ms` as the time of this check.
    async fn claim_provider_check(&self, order_id: &OrderId, now_ms: i64, cooldown_ms: i64)
        -> Result<bool, StoreError>;

    /// Deletes the order and its line items. Returns `false` if the order did not exist.
    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError>;
}
