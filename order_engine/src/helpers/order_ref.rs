use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::db_types::OrderId;

pub const ORDER_REFERENCE_PREFIX: &str = "ORDER";

/// Hands out `ORDER<unix-millis>` references that are strictly increasing within the process, even when several
/// orders are created in the same millisecond.
#[derive(Debug, Default)]
pub struct OrderReferenceGenerator {
    last: AtomicI64,
}

impl OrderReferenceGenerator {
    pub const fn new() -> Self {
        Self { last: AtomicI64::new(0) }
    }

    pub fn next_at(&self, now_ms: i64) -> OrderId {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now_ms.max(last + 1)))
            .unwrap_or_else(|last| last);
        let value = now_ms.max(previous + 1);
        OrderId(format!("{ORDER_REFERENCE_PREFIX}{value}"))
    }

    pub fn next(&self) -> OrderId {
        self.next_at(Utc::now().timestamp_millis())
    }
}

static GENERATOR: OrderReferenceGenerator = OrderReferenceGenerator::new();

/// The next reference from the process-wide generator.
pub fn next_order_reference() -> OrderId {
    GENERATOR.next()
}
