//! Affiliate accounts and their commissions.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use greenleaf_core::models::{Affiliate, AffiliateCommission};
use greenleaf_core::{AffiliateId, CommissionId, CommissionStatus};

use super::pricing::delete_by_id;
use super::{Page, RepositoryError, conflict_on_constraint};

const AFFILIATE_COLUMNS: &str = "id, code, name, email, commission_rate, customer_discount_code, \
     active, clicks, created_at";

const COMMISSION_COLUMNS: &str = "id, affiliate_id, order_id, order_subtotal, commission_rate, \
     amount, status, created_at, paid_at";

/// Editable affiliate fields. `code` is already normalized.
#[derive(Debug, Clone)]
pub struct AffiliateFields {
    pub code: String,
    pub name: String,
    pub email: String,
    pub commission_rate: Decimal,
    pub customer_discount_code: Option<String>,
    pub active: bool,
}

/// Commission totals per status for one affiliate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CommissionTotals {
    pub pending: Decimal,
    pub approved: Decimal,
    pub paid: Decimal,
    pub reversed: Decimal,
}

pub struct AffiliateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AffiliateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Affiliate>, RepositoryError> {
        let rows = sqlx::query_as::<_, Affiliate>(&format!(
            "SELECT {AFFILIATE_COLUMNS} FROM storefront.affiliate ORDER BY code"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AffiliateId) -> Result<Option<Affiliate>, RepositoryError> {
        let row = sqlx::query_as::<_, Affiliate>(&format!(
            "SELECT {AFFILIATE_COLUMNS} FROM storefront.affiliate WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, fields: &AffiliateFields) -> Result<Affiliate, RepositoryError> {
        sqlx::query_as::<_, Affiliate>(&format!(
            "INSERT INTO storefront.affiliate \
                 (code, name, email, commission_rate, customer_discount_code, active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {AFFILIATE_COLUMNS}"
        ))
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(fields.commission_rate)
        .bind(&fields.customer_discount_code)
        .bind(fields.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "affiliate code already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the affiliate doesn't exist.
    pub async fn update(
        &self,
        id: AffiliateId,
        fields: &AffiliateFields,
    ) -> Result<Affiliate, RepositoryError> {
        sqlx::query_as::<_, Affiliate>(&format!(
            "UPDATE storefront.affiliate \
             SET code = $2, name = $3, email = $4, commission_rate = $5, \
                 customer_discount_code = $6, active = $7 \
             WHERE id = $1 RETURNING {AFFILIATE_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(fields.commission_rate)
        .bind(&fields.customer_discount_code)
        .bind(fields.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "affiliate code already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an affiliate and, by cascade, its commissions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the affiliate doesn't exist.
    pub async fn delete(&self, id: AffiliateId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "storefront.affiliate", id.as_i32()).await
    }

    /// Commissions of one affiliate, newest first, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_commissions(
        &self,
        id: AffiliateId,
        status: Option<CommissionStatus>,
        page: Page,
    ) -> Result<Vec<AffiliateCommission>, RepositoryError> {
        let rows = sqlx::query_as::<_, AffiliateCommission>(&format!(
            "SELECT {COMMISSION_COLUMNS} FROM storefront.affiliate_commission \
             WHERE affiliate_id = $1 AND ($2::storefront.commission_status IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(id)
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Sum of commission amounts per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn commission_totals(&self, id: AffiliateId) -> Result<CommissionTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, CommissionTotals>(
            r"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0) AS pending,
                COALESCE(SUM(amount) FILTER (WHERE status = 'approved'), 0) AS approved,
                COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0) AS paid,
                COALESCE(SUM(amount) FILTER (WHERE status = 'reversed'), 0) AS reversed
            FROM storefront.affiliate_commission
            WHERE affiliate_id = $1
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }

    /// Mark approved commissions as paid.
    ///
    /// With `ids` empty every approved commission of the affiliate is paid.
    /// Commissions in any other status are left alone and not returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_paid(
        &self,
        id: AffiliateId,
        ids: &[CommissionId],
    ) -> Result<Vec<AffiliateCommission>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(|c| c.as_i32()).collect();
        let rows = sqlx::query_as::<_, AffiliateCommission>(&format!(
            "UPDATE storefront.affiliate_commission SET status = 'paid', paid_at = NOW() \
             WHERE affiliate_id = $1 AND status = 'approved' \
               AND (cardinality($2::INT[]) = 0 OR id = ANY($2)) \
             RETURNING {COMMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
