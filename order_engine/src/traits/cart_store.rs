use crate::{
    db_types::{CartItem, CartKey, NewCartItem},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait CartStore: Clone {
    /// Adds the item to the user's cart. Adding a line that is already in the cart increases its quantity.
    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, StoreError>;

    async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartItem>, StoreError>;

    /// Removes the given lines from the user's cart and returns the number of rows removed.
    async fn remove_cart_items(&self, user_id: &str, keys: &[CartKey]) -> Result<u64, StoreError>;
}
