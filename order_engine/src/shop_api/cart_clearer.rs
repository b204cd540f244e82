use log::*;

use crate::{
    db_types::{CartKey, OrderLineItem},
    traits::CartStore,
};

/// Removes ordered lines from the user's cart once an order has been placed. Best-effort: failures are logged and
/// never reach the caller.
pub struct CartClearer<B> {
    db: B,
}

impl<B> CartClearer<B>
where B: CartStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Returns the number of cart rows removed. Zero if clearing failed.
    pub async fn clear_ordered_items(&self, user_id: &str, items: &[OrderLineItem]) -> u64 {
        let keys = items
            .iter()
            .map(|i| CartKey::new(i.product_code.clone(), i.color.clone(), i.size.clone()))
            .collect::<Vec<_>>();
        match self.db.remove_cart_items(user_id, &keys).await {
            Ok(n) => {
                debug!("🛒️ Removed {n} ordered lines from {user_id}'s cart");
                n
            },
            Err(e) => {
                warn!("🛒️ Could not clear ordered items from {user_id}'s cart. {e}");
                0
            },
        }
    }
}
