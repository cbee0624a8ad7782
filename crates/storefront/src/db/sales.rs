//! Per-product sales counters behind the bestseller list.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use greenleaf_core::models::ProductSales;

use super::RepositoryError;

pub struct SalesRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalesRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Best-selling products by units sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bestsellers(&self, limit: i64) -> Result<Vec<ProductSales>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r"
            SELECT product_id, title, units_sold, revenue, updated_at
            FROM storefront.product_sales
            WHERE units_sold > 0
            ORDER BY units_sold DESC, revenue DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// Add sold units to a product's counters.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn record_sale(
    conn: &mut PgConnection,
    product_id: &str,
    title: &str,
    units: i64,
    revenue: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.product_sales (product_id, title, units_sold, revenue)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (product_id) DO UPDATE
        SET title = EXCLUDED.title,
            units_sold = storefront.product_sales.units_sold + EXCLUDED.units_sold,
            revenue = storefront.product_sales.revenue + EXCLUDED.revenue,
            updated_at = NOW()
        ",
    )
    .bind(product_id)
    .bind(title)
    .bind(units)
    .bind(revenue)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Take returned units off a product's counters, never below zero.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn record_return(
    conn: &mut PgConnection,
    product_id: &str,
    units: i64,
    revenue: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.product_sales
        SET units_sold = GREATEST(units_sold - $2, 0),
            revenue = GREATEST(revenue - $3, 0),
            updated_at = NOW()
        WHERE product_id = $1
        ",
    )
    .bind(product_id)
    .bind(units)
    .bind(revenue)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
