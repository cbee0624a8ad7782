//! Back-office summary counters.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Headline numbers for the dashboard.
///
/// Revenue excludes fully refunded orders and subtracts partial refunds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DashboardSummary {
    pub orders_total: i64,
    pub orders_last_30_days: i64,
    pub revenue_total: Decimal,
    pub revenue_last_30_days: Decimal,
    pub donations_total: Decimal,
    pub pending_reviews: i64,
    pub pending_commissions: Decimal,
    pub approved_commissions: Decimal,
    pub active_affiliates: i64,
    pub active_influencers: i64,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self) -> Result<DashboardSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, DashboardSummary>(
            r"
            WITH orders AS (
                SELECT
                    COUNT(*) AS orders_total,
                    COUNT(*) FILTER (WHERE created_at > NOW() - INTERVAL '30 days')
                        AS orders_last_30_days,
                    COALESCE(SUM(total - refunded_total) FILTER (WHERE status <> 'refunded'), 0)
                        AS revenue_total,
                    COALESCE(SUM(total - refunded_total) FILTER (
                        WHERE status <> 'refunded' AND created_at > NOW() - INTERVAL '30 days'
                    ), 0) AS revenue_last_30_days
                FROM storefront.order
            ),
            commissions AS (
                SELECT
                    COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0) AS pending_commissions,
                    COALESCE(SUM(amount) FILTER (WHERE status = 'approved'), 0) AS approved_commissions
                FROM storefront.affiliate_commission
            )
            SELECT
                orders.*,
                (SELECT COALESCE(SUM(amount), 0) FROM storefront.donation) AS donations_total,
                (SELECT COUNT(*) FROM storefront.review WHERE status = 'pending') AS pending_reviews,
                commissions.*,
                (SELECT COUNT(*) FROM storefront.affiliate WHERE active) AS active_affiliates,
                (SELECT COUNT(*) FROM storefront.influencer WHERE active) AS active_influencers
            FROM orders, commissions
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(summary)
    }
}
