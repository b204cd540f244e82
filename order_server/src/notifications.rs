//! Live "order paid" notifications.
//!
//! The engine publishes an `OrderPaidEvent` whenever an order actually moves to `paid`. The hook registered here
//! forwards it into the order's room, and every client subscribed to `/payments/events/{orderId}` receives a single
//! Server-Sent Event:
//!
//! ```text
//! event: order_paid
//! data: {"orderId":"ORDER1718000000000"}
//! ```
//!
//! after which the stream ends.
use std::{convert::Infallible, future::Future, pin::Pin};

use actix_web::web::Bytes;
use futures::{stream, Stream, StreamExt};
use log::*;
use order_engine::events::{EventHandlers, EventHooks, OrderPaidNotice, OrderRooms, ORDER_PAID_EVENT};
use tokio::sync::broadcast::{error::RecvError, Receiver};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

/// Wires the engine's paid events into `rooms`.
pub fn create_notification_handlers(rooms: OrderRooms) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let rooms = rooms.clone();
        Box::pin(async move {
            let reached = rooms.emit_paid(&ev.order.order_id);
            info!("📬️ Order {} is paid. {reached} live subscribers notified.", ev.order.order_id);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_cancelled(|ev| {
        Box::pin(async move {
            debug!("📬️ Order {} was cancelled", ev.order.order_id);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

/// Formats a paid notice as a Server-Sent Event frame.
pub fn sse_frame(notice: &OrderPaidNotice) -> String {
    let data = serde_json::to_string(notice).unwrap_or_else(|_| format!(r#"{{"orderId":"{}"}}"#, notice.order_id));
    format!("event: {ORDER_PAID_EVENT}\ndata: {data}\n\n")
}

/// The body of an SSE subscription. It opens with a comment line so that proxies flush the headers, then waits for the
/// room's paid notice. The stream ends after the notice, or when the room closes without one.
pub fn paid_event_stream(receiver: Receiver<OrderPaidNotice>) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let opening = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b": subscribed\n\n")) });
    let notices = stream::unfold(Some(receiver), |state| async move {
        let mut receiver = state?;
        loop {
            match receiver.recv().await {
                Ok(notice) => return Some((Ok(Bytes::from(sse_frame(&notice))), None)),
                Err(RecvError::Lagged(n)) => trace!("📬️ Subscriber lagged by {n} notices"),
                Err(RecvError::Closed) => return None,
            }
        }
    });
    opening.chain(notices)
}

/// A finished stream for orders that were already paid when the client subscribed.
pub fn already_paid_stream(notice: OrderPaidNotice) -> impl Stream<Item = Result<Bytes, Infallible>> {
    stream::once(async move { Ok::<_, Infallible>(Bytes::from(sse_frame(&notice))) })
}
