//! # Engine events
//!
//! The engine publishes events when something noteworthy happens to an order. Interested parties register async hooks
//! through [`EventHooks`]; the engine APIs hold the matching [`EventProducers`].
//!
//! [`OrderRooms`] is the order-scoped fan-out used to push "paid" notices to live subscribers.
mod channel;
mod event_types;
mod hooks;
mod rooms;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
pub use rooms::{OrderPaidNotice, OrderRooms, ORDER_PAID_EVENT};
