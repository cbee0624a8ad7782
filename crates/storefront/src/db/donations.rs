//! Donations and the public donation feed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use greenleaf_core::models::Donation;
use greenleaf_core::{DonationSource, OrderId};

use super::RepositoryError;

/// Running totals shown on the donations page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DonationSummary {
    pub total: Decimal,
    pub count: i64,
    pub round_up_total: Decimal,
    pub fixed_total: Decimal,
}

/// A donation as shown on the public feed. No order or contact data.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PublicDonation {
    pub amount: Decimal,
    pub currency_code: String,
    pub source: DonationSource,
    pub donor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read access to donations.
pub struct DonationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DonationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Totals across all donations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self) -> Result<DonationSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, DonationSummary>(
            r"
            SELECT
                COALESCE(SUM(amount), 0) AS total,
                COUNT(*) AS count,
                COALESCE(SUM(amount) FILTER (WHERE source = 'round_up'), 0) AS round_up_total,
                COALESCE(SUM(amount) FILTER (WHERE source = 'fixed'), 0) AS fixed_total
            FROM storefront.donation
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }

    /// Most recent donations, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<PublicDonation>, RepositoryError> {
        let rows = sqlx::query_as::<_, PublicDonation>(
            r"
            SELECT amount, currency_code, source, donor_name, created_at
            FROM storefront.donation
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// Record the donation carried on an order.
///
/// Returns `None` if the order already has one.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    amount: Decimal,
    currency_code: &str,
    source: DonationSource,
    donor_name: Option<&str>,
) -> Result<Option<Donation>, RepositoryError> {
    let donation = sqlx::query_as::<_, Donation>(
        r"
        INSERT INTO storefront.donation (order_id, amount, currency_code, source, donor_name)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (order_id) DO NOTHING
        RETURNING id, order_id, amount, currency_code, source, donor_name, created_at
        ",
    )
    .bind(order_id)
    .bind(amount)
    .bind(currency_code)
    .bind(source)
    .bind(donor_name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(donation)
}
