//! Influencer codes and redemptions.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use greenleaf_core::models::Influencer;
use greenleaf_core::{InfluencerId, OrderId};

use super::RepositoryError;

const INFLUENCER_COLUMNS: &str = "id, code, name, email, discount_percent, free_product_variant_id, \
     max_uses, uses, active, starts_at, expires_at, created_at";

/// Influencer lookups for code validation.
pub struct InfluencerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InfluencerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Influencer with this (normalized) code, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Influencer>, RepositoryError> {
        let influencer = sqlx::query_as::<_, Influencer>(&format!(
            "SELECT {INFLUENCER_COLUMNS} FROM storefront.influencer WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(influencer)
    }
}

/// Influencer with this code, inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Influencer>, RepositoryError> {
    let influencer = sqlx::query_as::<_, Influencer>(&format!(
        "SELECT {INFLUENCER_COLUMNS} FROM storefront.influencer WHERE code = $1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(influencer)
}

/// What happened when an order redeemed an influencer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    /// Recorded and counted against the usage limit.
    Counted,
    /// Recorded, but the code was already at its limit.
    OverLimit,
    /// The order had already been recorded.
    Duplicate,
}

/// Record a redemption and bump the usage counter.
///
/// The counter only moves while `uses < max_uses`, so concurrent orders can
/// never push it past the limit.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn redeem(
    conn: &mut PgConnection,
    influencer_id: InfluencerId,
    order_id: OrderId,
    order_subtotal: Decimal,
) -> Result<Redemption, RepositoryError> {
    let inserted = sqlx::query(
        r"
        INSERT INTO storefront.influencer_redemption (influencer_id, order_id, order_subtotal)
        VALUES ($1, $2, $3)
        ON CONFLICT (order_id) DO NOTHING
        ",
    )
    .bind(influencer_id)
    .bind(order_id)
    .bind(order_subtotal)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 0 {
        return Ok(Redemption::Duplicate);
    }

    let counted = sqlx::query(
        r"
        UPDATE storefront.influencer
        SET uses = uses + 1
        WHERE id = $1 AND (max_uses IS NULL OR uses < max_uses)
        ",
    )
    .bind(influencer_id)
    .execute(&mut *conn)
    .await?;

    Ok(if counted.rows_affected() == 0 {
        Redemption::OverLimit
    } else {
        Redemption::Counted
    })
}
