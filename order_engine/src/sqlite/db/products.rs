//! Catalog queries and the guarded stock updates.
use log::{debug, trace, warn};
use sqlx::{Connection, SqliteConnection};

use crate::db_types::{NewProduct, Product, ProductVariant, StockAdjustment, StockDirection, StockOutcome};

pub async fn fetch_product_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE code = $1").bind(code).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_variant(
    product_id: i64,
    color: &str,
    size: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductVariant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM product_variants WHERE product_id = $1 AND color = $2 AND size = $3")
        .bind(product_id)
        .bind(color)
        .bind(size)
        .fetch_optional(conn)
        .await
}

/// Inserts the product and its variants. Not atomic on its own; run it inside a transaction.
pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let inserted: Product = sqlx::query_as(
        r#"
            INSERT INTO products (code, name, brand, price, cost_price, total, thumbnail)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(product.code.trim())
    .bind(product.name)
    .bind(product.brand)
    .bind(product.price)
    .bind(product.cost_price)
    .bind(product.total)
    .bind(product.thumbnail)
    .fetch_one(&mut *conn)
    .await?;
    for variant in product.variants {
        sqlx::query("INSERT INTO product_variants (product_id, color, size, quantity) VALUES ($1, $2, $3, $4)")
            .bind(inserted.id)
            .bind(variant.color)
            .bind(variant.size)
            .bind(variant.quantity)
            .execute(&mut *conn)
            .await?;
    }
    debug!("📦️ Product {} ({}) added to the catalog with id {}", inserted.code, inserted.name, inserted.id);
    Ok(inserted)
}

pub async fn delete_product(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Applies one stock adjustment atomically.
///
/// The global counter is updated first, then the variant counters if the (color, size) pair names a tracked variant.
/// Each update carries its own guard (`sold <= total` for sales, no negative counters for restocks). The pair runs in
/// a nested transaction (a savepoint if the connection is already inside one), so a failed variant guard also undoes
/// the global update.
pub async fn adjust_stock(
    adjustment: &StockAdjustment,
    conn: &mut SqliteConnection,
) -> Result<StockOutcome, sqlx::Error> {
    let mut tx = conn.begin().await?;
    let StockAdjustment { product_id, quantity, direction, .. } = adjustment;
    let global_sql = match direction {
        StockDirection::Sale => {
            "UPDATE products SET sold = sold + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND sold + $1 <= total"
        },
        StockDirection::Restock => {
            "UPDATE products SET sold = sold - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND sold >= $1"
        },
    };
    let updated = sqlx::query(global_sql).bind(*quantity).bind(*product_id).execute(&mut *tx).await?.rows_affected();
    if updated == 0 {
        tx.rollback().await?;
        return match fetch_product(*product_id, conn).await? {
            None => {
                warn!("📦️ Product #{product_id} no longer exists. Stock adjustment skipped.");
                Ok(StockOutcome::ProductMissing)
            },
            Some(p) => {
                let available = match direction {
                    StockDirection::Sale => p.available(),
                    StockDirection::Restock => p.sold,
                };
                debug!("📦️ Stock guard failed for {}: wanted {quantity}, {available} available", p.code);
                Ok(StockOutcome::Insufficient { available })
            },
        };
    }
    let Some((color, size)) = adjustment.variant_key() else {
        tx.commit().await?;
        trace!("📦️ Product #{product_id}: sold adjusted by {quantity} ({direction:?})");
        return Ok(StockOutcome::Applied { variant_tracked: false });
    };
    let variant_sql = match direction {
        StockDirection::Sale => {
            "UPDATE product_variants SET quantity = quantity - $1, sold = sold + $1 WHERE product_id = $2 AND color = \
             $3 AND size = $4 AND quantity >= $1"
        },
        StockDirection::Restock => {
            "UPDATE product_variants SET quantity = quantity + $1, sold = sold - $1 WHERE product_id = $2 AND color = \
             $3 AND size = $4 AND sold >= $1"
        },
    };
    let updated = sqlx::query(variant_sql)
        .bind(*quantity)
        .bind(*product_id)
        .bind(color)
        .bind(size)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if updated > 0 {
        tx.commit().await?;
        trace!("📦️ Product #{product_id} [{color}/{size}]: stock adjusted by {quantity} ({direction:?})");
        return Ok(StockOutcome::Applied { variant_tracked: true });
    }
    match fetch_variant(*product_id, color, size, &mut tx).await? {
        None => {
            tx.commit().await?;
            trace!("📦️ Product #{product_id} has no [{color}/{size}] variant. Only the global count was adjusted.");
            Ok(StockOutcome::Applied { variant_tracked: false })
        },
        Some(v) => {
            tx.rollback().await?;
            let available = match direction {
                StockDirection::Sale => v.quantity,
                StockDirection::Restock => v.sold,
            };
            debug!("📦️ Variant guard failed for product #{product_id} [{color}/{size}]: {available} available");
            Ok(StockOutcome::Insufficient { available })
        },
    }
}
