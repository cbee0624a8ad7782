//! Affiliates, referral clicks and commissions.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use greenleaf_core::models::{Affiliate, AffiliateCommission};
use greenleaf_core::promo::commission_amount;
use greenleaf_core::{AffiliateId, OrderId};

use super::RepositoryError;

const AFFILIATE_COLUMNS: &str = "id, code, name, email, commission_rate, customer_discount_code, \
     active, clicks, created_at";

const COMMISSION_COLUMNS: &str = "id, affiliate_id, order_id, order_subtotal, commission_rate, \
     amount, status, created_at, paid_at";

/// Affiliate lookups for referral links and checkout.
pub struct AffiliateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AffiliateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active affiliate with this (normalized) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_code(&self, code: &str) -> Result<Option<Affiliate>, RepositoryError> {
        let affiliate = sqlx::query_as::<_, Affiliate>(&format!(
            "SELECT {AFFILIATE_COLUMNS} FROM storefront.affiliate WHERE code = $1 AND active"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(affiliate)
    }

    /// Count a referral link visit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_click(&self, id: AffiliateId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE storefront.affiliate SET clicks = clicks + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Active affiliate with this code, inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_active_by_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Affiliate>, RepositoryError> {
    let affiliate = sqlx::query_as::<_, Affiliate>(&format!(
        "SELECT {AFFILIATE_COLUMNS} FROM storefront.affiliate WHERE code = $1 AND active"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(affiliate)
}

/// Record the commission an affiliate earns on an order.
///
/// Returns `None` when the affiliate already has a commission for the order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_commission(
    conn: &mut PgConnection,
    affiliate: &Affiliate,
    order_id: OrderId,
    subtotal: Decimal,
) -> Result<Option<AffiliateCommission>, RepositoryError> {
    let amount = commission_amount(subtotal, affiliate.commission_rate);
    let commission = sqlx::query_as::<_, AffiliateCommission>(&format!(
        "INSERT INTO storefront.affiliate_commission \
             (affiliate_id, order_id, order_subtotal, commission_rate, amount) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (affiliate_id, order_id) DO NOTHING \
         RETURNING {COMMISSION_COLUMNS}"
    ))
    .bind(affiliate.id)
    .bind(order_id)
    .bind(subtotal)
    .bind(affiliate.commission_rate)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(commission)
}

/// Approve the pending commissions of a shipped order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn approve_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.affiliate_commission
        SET status = 'approved'
        WHERE order_id = $1 AND status = 'pending'
        ",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Reverse every commission on the order that has not been paid out.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn reverse_unpaid_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.affiliate_commission
        SET status = 'reversed'
        WHERE order_id = $1 AND status IN ('pending', 'approved')
        ",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Take returned merchandise out of the base of unpaid commissions.
///
/// `refunded_merchandise` is the line subtotal refunded by one refund.
/// Shipping and tax never reach the base.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn reduce_unpaid_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    refunded_merchandise: Decimal,
) -> Result<u64, RepositoryError> {
    let commissions = sqlx::query_as::<_, AffiliateCommission>(&format!(
        "SELECT {COMMISSION_COLUMNS} FROM storefront.affiliate_commission \
         WHERE order_id = $1 AND status IN ('pending', 'approved')"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut updated = 0;
    for commission in &commissions {
        let subtotal = reduced_base(commission.order_subtotal, refunded_merchandise);
        let result = sqlx::query(
            r"
            UPDATE storefront.affiliate_commission
            SET order_subtotal = $2, amount = $3
            WHERE id = $1
            ",
        )
        .bind(commission.id)
        .bind(subtotal)
        .bind(commission_amount(subtotal, commission.commission_rate))
        .execute(&mut *conn)
        .await?;
        updated += result.rows_affected();
    }

    Ok(updated)
}

fn reduced_base(base: Decimal, refunded_merchandise: Decimal) -> Decimal {
    (base - refunded_merchandise.max(Decimal::ZERO)).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_base_subtracts_returned_merchandise() {
        assert_eq!(reduced_base(Decimal::new(4000, 2), Decimal::new(1500, 2)), Decimal::new(2500, 2));
        assert_eq!(reduced_base(Decimal::new(4000, 2), Decimal::ZERO), Decimal::new(4000, 2));
    }

    #[test]
    fn test_reduced_base_floors_at_zero() {
        assert_eq!(reduced_base(Decimal::new(4000, 2), Decimal::new(5500, 2)), Decimal::ZERO);
        assert_eq!(reduced_base(Decimal::new(4000, 2), Decimal::new(-500, 2)), Decimal::new(4000, 2));
    }
}
