use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderLineItem, OrderStatusType},
    order_objects::OrderQueryFilter,
};

/// Inserts a new order and its line items using the given connection. This is not atomic. Embed the call inside a
/// transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let address = &order.shipping_address;
    let mut inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                user_id,
                subtotal,
                discount_amount,
                shipping_fee,
                total_price,
                status,
                payment_method,
                shipping_method,
                voucher_code,
                full_name,
                phone,
                address_line,
                city,
                district,
                ward,
                note,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.user_id.as_str())
    .bind(order.subtotal)
    .bind(order.discount_amount)
    .bind(order.shipping_fee)
    .bind(order.total_price)
    .bind(order.initial_status().as_str())
    .bind(order.payment_method.to_string())
    .bind(order.shipping_method.as_str())
    .bind(order.voucher_code.as_deref())
    .bind(address.full_name.as_str())
    .bind(address.phone.as_str())
    .bind(address.address_line.as_str())
    .bind(address.city.as_str())
    .bind(address.district.as_str())
    .bind(address.ward.as_str())
    .bind(address.note.as_deref())
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        insert_line_item(inserted.id, item, conn).await?;
    }
    inserted.items = fetch_line_items(inserted.id, conn).await?;
    debug!("🗃️ Order [{}] inserted with id {} and {} line items", inserted.order_id, inserted.id, inserted.items.len());
    Ok(inserted)
}

async fn insert_line_item(order_row_id: i64, item: &NewLineItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO order_items (
                order_row_id,
                product_id,
                product_code,
                product_name,
                product_image,
                unit_price,
                cost_price,
                quantity,
                color,
                size
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
        "#,
    )
    .bind(order_row_id)
    .bind(item.product_id)
    .bind(item.product_code.as_str())
    .bind(item.product_name.as_str())
    .bind(item.product_image.as_str())
    .bind(item.unit_price)
    .bind(item.cost_price)
    .bind(item.quantity)
    .bind(item.color.as_deref())
    .bind(item.size.as_deref())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_line_items(order_row_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLineItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_row_id = $1 ORDER BY id")
        .bind(order_row_id)
        .fetch_all(conn)
        .await
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_line_items(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Returns the order with the given reference, including its line items.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are sorted by `created_at`, newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = &query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id.clone());
    }
    if let Some(statuses) = query.status.as_ref().filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.as_str());
        }
        where_clause.push_unseparated(")");
    }
    if let Some(method) = &query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method.to_string());
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some((limit, offset)) = query.limit_offset() {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders: Vec<Order> = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    let mut result = Vec::with_capacity(orders.len());
    for mut order in orders {
        order.items = fetch_line_items(order.id, conn).await?;
        result.push(order);
    }
    trace!("🗃️ Result of search_orders: {}", result.len());
    Ok(result)
}

/// Moves the order to `to` if and only if its current status is one of `from`. The check and the write are one
/// statement. Returns `None` if no row matched.
pub async fn transition_status(
    order_id: &OrderId,
    from: &[OrderStatusType],
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    if from.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(to.as_str());
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE order_id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(status.as_str());
    }
    builder.push(") RETURNING *");
    let order: Option<Order> = builder.build_query_as().fetch_optional(&mut *conn).await?;
    if let Some(o) = &order {
        debug!("🗃️ Order [{}] is now {to}", o.order_id);
    }
    with_items(order, conn).await
}

/// Records `now_ms` as the latest provider check, unless another check was recorded less than `cooldown_ms` ago.
pub async fn claim_provider_check(
    order_id: &OrderId,
    now_ms: i64,
    cooldown_ms: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET last_provider_check_at = $1
            WHERE order_id = $2 AND (last_provider_check_at IS NULL OR last_provider_check_at <= $1 - $3)
        "#,
    )
    .bind(now_ms)
    .bind(order_id.as_str())
    .bind(cooldown_ms)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    sqlx::query("DELETE FROM order_items WHERE order_row_id IN (SELECT id FROM orders WHERE order_id = $1)")
        .bind(order_id.as_str())
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
