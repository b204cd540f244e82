use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CartItem, CartKey, NewCartItem};

/// Adds a line to the cart, or increases the quantity of an identical line.
pub async fn upsert_cart_item(item: NewCartItem, conn: &mut SqliteConnection) -> Result<CartItem, sqlx::Error> {
    let key = item.key();
    sqlx::query_as(
        r#"
            INSERT INTO cart_items (user_id, product_code, color, size, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, product_code, color, size) DO UPDATE SET quantity = quantity + excluded.quantity
            RETURNING *;
        "#,
    )
    .bind(item.user_id)
    .bind(key.product_code)
    .bind(key.color)
    .bind(key.size)
    .bind(item.quantity)
    .fetch_one(conn)
    .await
}

pub async fn fetch_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 ORDER BY id").bind(user_id).fetch_all(conn).await
}

pub async fn remove_cart_item(user_id: &str, key: &CartKey, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_code = $2 AND color = $3 AND size = $4")
            .bind(user_id)
            .bind(key.product_code.as_str())
            .bind(key.color.as_str())
            .bind(key.size.as_str())
            .execute(conn)
            .await?;
    trace!("🛒️ Removed {} rows for {} from {user_id}'s cart", result.rows_affected(), key.product_code);
    Ok(result.rows_affected())
}
