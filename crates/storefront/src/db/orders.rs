//! Orders ingested from Shopify webhooks.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use greenleaf_core::models::{Order, OrderLine};
use greenleaf_core::{OrderId, OrderStatus, UserId};

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, shopify_order_id, order_number, email, user_id, currency_code, \
     subtotal, total, refunded_total, status, affiliate_code, influencer_code, created_at, updated_at";

/// Fields of a newly paid order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub shopify_order_id: i64,
    pub order_number: &'a str,
    pub email: Option<&'a str>,
    pub user_id: Option<UserId>,
    pub currency_code: &'a str,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub affiliate_code: Option<&'a str>,
    pub influencer_code: Option<&'a str>,
}

/// A line of a newly paid order.
#[derive(Debug, Clone)]
pub struct NewOrderLine<'a> {
    pub shopify_line_id: i64,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub title: &'a str,
    pub quantity: i32,
    pub price: Decimal,
}

/// Read access to a member's orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A member's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Lines of the given orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_orders(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<OrderLine>, RepositoryError> {
        let ids: Vec<i32> = order_ids.iter().map(OrderId::as_i32).collect();
        let lines = sqlx::query_as::<_, OrderLine>(
            r"
            SELECT order_id, shopify_line_id, product_id, variant_id, title, quantity, price
            FROM storefront.order_line
            WHERE order_id = ANY($1)
            ORDER BY order_id, shopify_line_id
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(lines)
    }
}

/// Insert a paid order.
///
/// Returns `None` when an order with this Shopify id already exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<Option<Order>, RepositoryError> {
    let inserted = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO storefront.order (shopify_order_id, order_number, email, user_id, \
             currency_code, subtotal, total, affiliate_code, influencer_code) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (shopify_order_id) DO NOTHING \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.shopify_order_id)
    .bind(order.order_number)
    .bind(order.email)
    .bind(order.user_id)
    .bind(order.currency_code)
    .bind(order.subtotal)
    .bind(order.total)
    .bind(order.affiliate_code)
    .bind(order.influencer_code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(inserted)
}

/// Insert the lines of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_lines(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[NewOrderLine<'_>],
) -> Result<(), RepositoryError> {
    for line in lines {
        sqlx::query(
            r"
            INSERT INTO storefront.order_line
                (order_id, shopify_line_id, product_id, variant_id, title, quantity, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id, shopify_line_id) DO NOTHING
            ",
        )
        .bind(order_id)
        .bind(line.shopify_line_id)
        .bind(line.product_id.as_deref())
        .bind(line.variant_id.as_deref())
        .bind(line.title)
        .bind(line.quantity)
        .bind(line.price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Look up an order by Shopify id, locking the row for the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_shopify_id(
    conn: &mut PgConnection,
    shopify_order_id: i64,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE shopify_order_id = $1 FOR UPDATE"
    ))
    .bind(shopify_order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

/// A stored line of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    shopify_line_id: i64,
) -> Result<Option<OrderLine>, RepositoryError> {
    let line = sqlx::query_as::<_, OrderLine>(
        r"
        SELECT order_id, shopify_line_id, product_id, variant_id, title, quantity, price
        FROM storefront.order_line
        WHERE order_id = $1 AND shopify_line_id = $2
        ",
    )
    .bind(order_id)
    .bind(shopify_line_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(line)
}

/// Set an order's status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.order SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(status)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Add a refund to an order and set its status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn record_refund(
    conn: &mut PgConnection,
    order_id: OrderId,
    refunded_total: Decimal,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.order
        SET refunded_total = $2, status = $3, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(order_id)
    .bind(refunded_total)
    .bind(status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
