//! Influencer codes and their redemptions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use greenleaf_core::InfluencerId;
use greenleaf_core::models::{Influencer, InfluencerRedemption};

use super::pricing::delete_by_id;
use super::{Page, RepositoryError, conflict_on_constraint};

const INFLUENCER_COLUMNS: &str = "id, code, name, email, discount_percent, free_product_variant_id, \
     max_uses, uses, active, starts_at, expires_at, created_at";

/// Editable influencer fields. `code` is already normalized.
#[derive(Debug, Clone)]
pub struct InfluencerFields {
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub discount_percent: Decimal,
    pub free_product_variant_id: Option<String>,
    pub max_uses: Option<i32>,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct InfluencerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InfluencerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Influencer>, RepositoryError> {
        let rows = sqlx::query_as::<_, Influencer>(&format!(
            "SELECT {INFLUENCER_COLUMNS} FROM storefront.influencer ORDER BY code"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InfluencerId) -> Result<Option<Influencer>, RepositoryError> {
        let row = sqlx::query_as::<_, Influencer>(&format!(
            "SELECT {INFLUENCER_COLUMNS} FROM storefront.influencer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, fields: &InfluencerFields) -> Result<Influencer, RepositoryError> {
        sqlx::query_as::<_, Influencer>(&format!(
            "INSERT INTO storefront.influencer \
                 (code, name, email, discount_percent, free_product_variant_id, \
                  max_uses, active, starts_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {INFLUENCER_COLUMNS}"
        ))
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(fields.discount_percent)
        .bind(&fields.free_product_variant_id)
        .bind(fields.max_uses)
        .bind(fields.active)
        .bind(fields.starts_at)
        .bind(fields.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "influencer code already exists"))
    }

    /// Update an influencer. `uses` is never touched here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the influencer doesn't exist, or
    /// `RepositoryError::Conflict` if the code is taken or `max_uses` is
    /// below the uses already counted.
    pub async fn update(
        &self,
        id: InfluencerId,
        fields: &InfluencerFields,
    ) -> Result<Influencer, RepositoryError> {
        sqlx::query_as::<_, Influencer>(&format!(
            "UPDATE storefront.influencer \
             SET code = $2, name = $3, email = $4, discount_percent = $5, \
                 free_product_variant_id = $6, max_uses = $7, active = $8, \
                 starts_at = $9, expires_at = $10 \
             WHERE id = $1 RETURNING {INFLUENCER_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(fields.discount_percent)
        .bind(&fields.free_product_variant_id)
        .bind(fields.max_uses)
        .bind(fields.active)
        .bind(fields.starts_at)
        .bind(fields.expires_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            conflict_on_constraint(e, "code already exists or max_uses is below current uses")
        })?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the influencer doesn't exist.
    pub async fn delete(&self, id: InfluencerId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "storefront.influencer", id.as_i32()).await
    }

    /// Redemptions of one code, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_redemptions(
        &self,
        id: InfluencerId,
        page: Page,
    ) -> Result<Vec<InfluencerRedemption>, RepositoryError> {
        let rows = sqlx::query_as::<_, InfluencerRedemption>(
            r"
            SELECT id, influencer_id, order_id, order_subtotal, created_at
            FROM storefront.influencer_redemption
            WHERE influencer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
