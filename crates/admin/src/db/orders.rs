//! Read-only views over orders, donations and product sales.
//!
//! These tables are written by the storefront's webhook processor; the
//! back-office only reads them.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use greenleaf_core::models::{Donation, Order, OrderLine, ProductSales};
use greenleaf_core::{OrderId, OrderStatus};

use super::{Page, RepositoryError};

const ORDER_COLUMNS: &str = "id, shopify_order_id, order_number, email, user_id, currency_code, \
     subtotal, total, refunded_total, status, affiliate_code, influencer_code, created_at, updated_at";

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders newest first, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: Page,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order \
             WHERE $1::storefront.order_status IS NULL OR status = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLine>(
            r"
            SELECT order_id, shopify_line_id, product_id, variant_id, title, quantity, price
            FROM storefront.order_line
            WHERE order_id = $1
            ORDER BY shopify_line_id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Donation totals across all time, split by source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DonationTotals {
    pub count: i64,
    pub total: Decimal,
    pub round_up: Decimal,
    pub fixed: Decimal,
}

pub struct DonationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DonationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: Page) -> Result<Vec<Donation>, RepositoryError> {
        let rows = sqlx::query_as::<_, Donation>(
            r"
            SELECT id, order_id, amount, currency_code, source, donor_name, created_at
            FROM storefront.donation
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self) -> Result<DonationTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, DonationTotals>(
            r"
            SELECT
                COUNT(*) AS count,
                COALESCE(SUM(amount), 0) AS total,
                COALESCE(SUM(amount) FILTER (WHERE source = 'round_up'), 0) AS round_up,
                COALESCE(SUM(amount) FILTER (WHERE source = 'fixed'), 0) AS fixed
            FROM storefront.donation
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }
}

pub struct SalesRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalesRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Per-product counters, best sellers first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: Page) -> Result<Vec<ProductSales>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r"
            SELECT product_id, title, units_sold, revenue, updated_at
            FROM storefront.product_sales
            ORDER BY units_sold DESC, product_id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
