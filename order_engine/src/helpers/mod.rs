mod memo;
mod order_ref;

pub use memo::{extract_order_reference, is_order_reference, memo_names_order};
pub use order_ref::{next_order_reference, OrderReferenceGenerator, ORDER_REFERENCE_PREFIX};
