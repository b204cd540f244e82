use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{NewVoucher, UserVoucher, Voucher, VoucherUpdate};

pub async fn fetch_voucher_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Voucher>, sqlx::Error> {
    let code = code.trim().to_uppercase();
    sqlx::query_as("SELECT * FROM vouchers WHERE code = $1").bind(code).fetch_optional(conn).await
}

pub async fn fetch_voucher(id: i64, conn: &mut SqliteConnection) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM vouchers WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_all_vouchers(conn: &mut SqliteConnection) -> Result<Vec<Voucher>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM vouchers ORDER BY created_at DESC, id DESC").fetch_all(conn).await
}

pub async fn insert_voucher(voucher: NewVoucher, conn: &mut SqliteConnection) -> Result<Voucher, sqlx::Error> {
    let inserted: Voucher = sqlx::query_as(
        r#"
            INSERT INTO vouchers (
                code,
                name,
                description,
                discount_type,
                value,
                min_order_amount,
                valid_from,
                valid_until,
                max_uses,
                max_uses_per_user,
                is_active,
                created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(voucher.code)
    .bind(voucher.name)
    .bind(voucher.description)
    .bind(voucher.discount_type.to_string())
    .bind(voucher.value)
    .bind(voucher.min_order_amount)
    .bind(voucher.valid_from)
    .bind(voucher.valid_until)
    .bind(voucher.max_uses)
    .bind(voucher.max_uses_per_user)
    .bind(voucher.is_active)
    .bind(voucher.created_by)
    .fetch_one(conn)
    .await?;
    debug!("🎟️ Voucher {} created with id {}", inserted.code, inserted.id);
    Ok(inserted)
}

/// Applies the non-empty fields of `update`. Returns `None` if the voucher does not exist.
pub async fn update_voucher(
    id: i64,
    update: VoucherUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Voucher>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE vouchers SET updated_at = CURRENT_TIMESTAMP");
    if let Some(code) = update.code {
        builder.push(", code = ").push_bind(code);
    }
    if let Some(name) = update.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(description) = update.description {
        builder.push(", description = ").push_bind(description);
    }
    if let Some(discount_type) = update.discount_type {
        builder.push(", discount_type = ").push_bind(discount_type.to_string());
    }
    if let Some(value) = update.value {
        builder.push(", value = ").push_bind(value);
    }
    if let Some(min) = update.min_order_amount {
        builder.push(", min_order_amount = ").push_bind(min);
    }
    if let Some(from) = update.valid_from {
        builder.push(", valid_from = ").push_bind(from);
    }
    if let Some(until) = update.valid_until {
        builder.push(", valid_until = ").push_bind(until);
    }
    if let Some(max_uses) = update.max_uses {
        builder.push(", max_uses = ").push_bind(max_uses);
    }
    if let Some(max_uses_per_user) = update.max_uses_per_user {
        builder.push(", max_uses_per_user = ").push_bind(max_uses_per_user);
    }
    if let Some(active) = update.is_active {
        builder.push(", is_active = ").push_bind(active);
    }
    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    trace!("🎟️ Executing query: {}", builder.sql());
    builder.build_query_as().fetch_optional(conn).await
}

pub async fn delete_voucher(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM vouchers WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_claim(
    user_id: &str,
    voucher_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<UserVoucher>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM user_vouchers WHERE user_id = $1 AND voucher_id = $2")
        .bind(user_id)
        .bind(voucher_id)
        .fetch_optional(conn)
        .await
}

/// Inserts a claim if the user does not hold one yet and the number of claims is below `cap` (`0` disables the cap).
/// Returns `None` if nothing was inserted.
pub async fn insert_claim(
    user_id: &str,
    voucher_id: i64,
    cap: i64,
    claimed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<UserVoucher>, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO user_vouchers (user_id, voucher_id, claimed_at, usage_count)
            SELECT $1, $2, $3, 0
            WHERE $4 = 0 OR (SELECT COUNT(*) FROM user_vouchers WHERE voucher_id = $2) < $4
            ON CONFLICT (user_id, voucher_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(voucher_id)
    .bind(claimed_at)
    .bind(cap)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_claims_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<UserVoucher>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM user_vouchers WHERE user_id = $1 ORDER BY claimed_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Records one use of the claim against `order_id`, guarded by the per-user cap (`0` disables the guard). Legacy claims
/// with `used_at` set and a zero count are treated as already used once.
pub async fn consume_claim(
    claim_id: i64,
    per_user_cap: i64,
    order_id: &str,
    used_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE user_vouchers
            SET usage_count = (CASE WHEN usage_count = 0 AND used_at IS NOT NULL THEN 1 ELSE usage_count END) + 1,
                used_at = $1,
                order_id = $2
            WHERE id = $3
              AND ($4 = 0 OR (CASE WHEN usage_count = 0 AND used_at IS NOT NULL THEN 1 ELSE usage_count END) < $4)
        "#,
    )
    .bind(used_at)
    .bind(order_id)
    .bind(claim_id)
    .bind(per_user_cap)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Increments the voucher's global use count, guarded by its cap (`0` disables the guard).
pub async fn increment_used_count(voucher_id: i64, cap: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE vouchers SET used_count = used_count + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND ($2 = 0 OR used_count < $2)
        "#,
    )
    .bind(voucher_id)
    .bind(cap)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
