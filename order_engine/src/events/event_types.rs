use crate::db_types::Order;

/// Published exactly once per order, by whichever caller's conditional update moved the order to `paid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after an order has been cancelled and its stock returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
