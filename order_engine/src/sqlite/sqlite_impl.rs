//! `SqliteDatabase` is a concrete implementation of an order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{carts, db_url, new_pool, orders, products, vouchers};
use crate::{
    db_types::{
        CartItem,
        CartKey,
        NewCartItem,
        NewOrder,
        NewProduct,
        NewVoucher,
        Order,
        OrderId,
        OrderStatusType,
        Product,
        ProductVariant,
        StockAdjustment,
        StockOutcome,
        UsageCap,
        UserVoucher,
        Voucher,
        VoucherRedemption,
        VoucherUpdate,
    },
    order_objects::OrderQueryFilter,
    traits::{CartStore, Catalog, ClaimOutcome, OrderStore, ShopDatabase, StoreError, VoucherStore},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ShopDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn place_order(&self, order: NewOrder, voucher: Option<VoucherRedemption>) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_order(&order, &mut tx).await?;
        for item in &order.items {
            match products::adjust_stock(&StockAdjustment::sale(item), &mut tx).await? {
                StockOutcome::Applied { variant_tracked } => {
                    let oid = &order.order_id;
                    trace!("🗃️ Order [{oid}]: {} x{} reserved. Variant: {variant_tracked}", item.product_code, item.quantity);
                },
                StockOutcome::ProductMissing => {
                    warn!(
                        "🗃️ Order [{}]: product {} disappeared from the catalog while the order was being placed. No \
                         stock was reserved for it.",
                        order.order_id, item.product_code
                    );
                },
                StockOutcome::Insufficient { available } => {
                    tx.rollback().await?;
                    info!("🗃️ Order [{}] rolled back. {} is out of stock.", order.order_id, item.product_code);
                    return Err(StoreError::InsufficientStock {
                        product: item.product_code.clone(),
                        requested: item.quantity,
                        available,
                    });
                },
            }
        }
        if let Some(redemption) = voucher {
            let code = redemption.voucher_code;
            let cap = redemption.per_user_cap.as_sql_cap();
            let oid = order.order_id.as_str();
            if !vouchers::consume_claim(redemption.claim_id, cap, oid, Utc::now(), &mut tx).await? {
                tx.rollback().await?;
                info!("🗃️ Order [{oid}] rolled back. The claim on voucher {code} has no uses left.");
                return Err(StoreError::VoucherUserLimitReached(code));
            }
            let cap = redemption.global_cap.as_sql_cap();
            if !vouchers::increment_used_count(redemption.voucher_id, cap, &mut tx).await? {
                tx.rollback().await?;
                info!("🗃️ Order [{oid}] rolled back. Voucher {code} is exhausted.");
                return Err(StoreError::VoucherGloballyExhausted(code));
            }
            debug!("🗃️ Voucher {code} consumed by order [{oid}]");
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn cancel_order(&self, order_id: &OrderId, from: &[OrderStatusType]) -> Result<Option<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::transition_status(order_id, from, OrderStatusType::Cancelled, &mut tx).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        for item in &order.items {
            match products::adjust_stock(&StockAdjustment::restock(item), &mut tx).await? {
                StockOutcome::Applied { .. } => {
                    trace!("🗃️ Order [{order_id}]: {} x{} returned to stock", item.product_code, item.quantity);
                },
                StockOutcome::ProductMissing => {
                    warn!(
                        "🗃️ Order [{order_id}]: product {} no longer exists. Its stock was not restored.",
                        item.product_code
                    );
                },
                StockOutcome::Insufficient { available } => {
                    warn!(
                        "🗃️ Order [{order_id}]: returning {} x{} would make the sold count negative (sold: \
                         {available}). Skipped.",
                        item.product_code, item.quantity
                    );
                },
            }
        }
        tx.commit().await?;
        Ok(Some(order))
    }
}

impl Catalog for SqliteDatabase {
    async fn fetch_product_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product_by_code(code, &mut conn).await?)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_variant(
        &self,
        product_id: i64,
        color: &str,
        size: &str,
    ) -> Result<Option<ProductVariant>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_variant(product_id, color, size, &mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn remove_product(&self, product_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::delete_product(product_id, &mut conn).await?)
    }

    async fn adjust_stock(&self, adjustment: &StockAdjustment) -> Result<StockOutcome, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::adjust_stock(adjustment, &mut conn).await?)
    }
}

impl VoucherStore for SqliteDatabase {
    async fn fetch_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vouchers::fetch_voucher_by_code(code, &mut conn).await?)
    }

    async fn fetch_voucher(&self, voucher_id: i64) -> Result<Option<Voucher>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vouchers::fetch_voucher(voucher_id, &mut conn).await?)
    }

    async fn list_vouchers(&self, redeemable_at: Option<DateTime<Utc>>) -> Result<Vec<Voucher>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let all = vouchers::fetch_all_vouchers(&mut conn).await?;
        let result = match redeemable_at {
            Some(at) => all.into_iter().filter(|v| v.is_redeemable_at(at)).collect(),
            None => all,
        };
        Ok(result)
    }

    async fn insert_voucher(&self, voucher: NewVoucher) -> Result<Voucher, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vouchers::insert_voucher(voucher, &mut conn).await?)
    }

    async fn update_voucher(&self, voucher_id: i64, update: VoucherUpdate) -> Result<Option<Voucher>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        if update.is_empty() {
            return Ok(vouchers::fetch_voucher(voucher_id, &mut conn).await?);
        }
        Ok(vouchers::update_voucher(voucher_id, update, &mut conn).await?)
    }

    async fn delete_voucher(&self, voucher_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vouchers::delete_voucher(voucher_id, &mut conn).await?)
    }

    async fn fetch_claim(&self, user_id: &str, voucher_id: i64) -> Result<Option<UserVoucher>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vouchers::fetch_claim(user_id, voucher_id, &mut conn).await?)
    }

    async fn insert_claim(&self, user_id: &str, voucher_id: i64, cap: UsageCap) -> Result<ClaimOutcome, StoreError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(existing) = vouchers::fetch_claim(user_id, voucher_id, &mut conn).await? {
            return Ok(ClaimOutcome::Existing(existing));
        }
        let inserted = vouchers::insert_claim(user_id, voucher_id, cap.as_sql_cap(), Utc::now(), &mut conn).await?;
        let outcome = match inserted {
            Some(claim) => ClaimOutcome::Created(claim),
            // Either a concurrent request created the claim, or the cap was reached
            None => match vouchers::fetch_claim(user_id, voucher_id, &mut conn).await? {
                Some(claim) => ClaimOutcome::Existing(claim),
                None => ClaimOutcome::Exhausted,
            },
        };
        Ok(outcome)
    }

    async fn fetch_claims_for_user(&self, user_id: &str) -> Result<Vec<(UserVoucher, Voucher)>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let claims = vouchers::fetch_claims_for_user(user_id, &mut conn).await?;
        let mut result = Vec::with_capacity(claims.len());
        for claim in claims {
            match vouchers::fetch_voucher(claim.voucher_id, &mut conn).await? {
                Some(voucher) => result.push((claim, voucher)),
                None => trace!("🗃️ Claim #{} refers to a deleted voucher", claim.id),
            }
        }
        Ok(result)
    }
}

impl OrderStore for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::transition_status(order_id, from, to, &mut conn).await?)
    }

    async fn claim_provider_check(
        &self,
        order_id: &OrderId,
        now_ms: i64,
        cooldown_ms: i64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::claim_provider_check(order_id, now_ms, cooldown_ms, &mut conn).await?)
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = orders::delete_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

impl CartStore for SqliteDatabase {
    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::upsert_cart_item(item, &mut conn).await?)
    }

    async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_cart(user_id, &mut conn).await?)
    }

    async fn remove_cart_items(&self, user_id: &str, keys: &[CartKey]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for key in keys {
            removed += carts::remove_cart_item(user_id, key, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
