//! Order-scoped notification rooms.
//!
//! Every order reference can have a room. Subscribers join by taking a [`broadcast::Receiver`] and leave by dropping
//! it. Delivery is fire-and-forget: a subscriber that is not listening when the notice goes out misses it, and the
//! order's stored status stays the source of truth.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db_types::OrderId;

/// The event name subscribers listen for.
pub const ORDER_PAID_EVENT: &str = "order_paid";

const DEFAULT_ROOM_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaidNotice {
    pub order_id: OrderId,
}

type RoomMap = HashMap<OrderId, broadcast::Sender<OrderPaidNotice>>;

#[derive(Debug, Clone)]
pub struct OrderRooms {
    rooms: Arc<Mutex<RoomMap>>,
    capacity: usize,
}

impl Default for OrderRooms {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_CAPACITY)
    }
}

impl OrderRooms {
    pub fn new(capacity: usize) -> Self {
        Self { rooms: Arc::new(Mutex::new(HashMap::new())), capacity: capacity.max(1) }
    }

    fn lock(&self) -> MutexGuard<'_, RoomMap> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the room for `order_id`, creating it if necessary.
    pub fn join(&self, order_id: &OrderId) -> broadcast::Receiver<OrderPaidNotice> {
        let mut rooms = self.lock();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        let sender = rooms.entry(order_id.clone()).or_insert_with(|| broadcast::channel(self.capacity).0);
        trace!("📬️ New subscriber for order {order_id}. {} in the room", sender.receiver_count() + 1);
        sender.subscribe()
    }

    /// Pushes the paid notice into the order's room and closes the room. Returns the number of subscribers reached.
    pub fn emit_paid(&self, order_id: &OrderId) -> usize {
        let sender = self.lock().remove(order_id);
        let notice = OrderPaidNotice { order_id: order_id.clone() };
        let reached = sender.map(|s| s.send(notice).unwrap_or(0)).unwrap_or(0);
        debug!("📬️ {ORDER_PAID_EVENT} for {order_id} delivered to {reached} subscribers");
        reached
    }

    /// Drops rooms that nobody is listening to. Returns the number of rooms removed.
    pub fn prune(&self) -> usize {
        let mut rooms = self.lock();
        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - rooms.len()
    }

    pub fn room_count(&self) -> usize {
        self.lock().len()
    }

    pub fn subscriber_count(&self, order_id: &OrderId) -> usize {
        self.lock().get(order_id).map(|s| s.receiver_count()).unwrap_or(0)
    }
}
