//! Volume tiers, bundles and member prices.
//!
//! Rows are validated against the discount engine's rules before they get
//! here; the table constraints are a second line.

use rust_decimal::Decimal;
use sqlx::PgPool;

use greenleaf_core::models::{BundlePricing, MemberPrice, VolumeDiscount};
use greenleaf_core::{BundleId, VolumeDiscountId};

use super::{Page, RepositoryError, conflict_on_constraint};

const VOLUME_COLUMNS: &str = "id, min_quantity, percent, active, created_at";
const BUNDLE_COLUMNS: &str = "id, name, product_ids, percent, active, created_at";
const MEMBER_PRICE_COLUMNS: &str = "variant_id, product_id, price, updated_at";

/// Fields of a volume tier.
#[derive(Debug, Clone, Copy)]
pub struct VolumeDiscountFields {
    pub min_quantity: i32,
    pub percent: Decimal,
    pub active: bool,
}

/// Fields of a bundle.
#[derive(Debug, Clone)]
pub struct BundleFields {
    pub name: String,
    pub product_ids: Vec<String>,
    pub percent: Decimal,
    pub active: bool,
}

pub struct PricingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PricingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Volume discounts
    // =========================================================================

    /// Every tier, smallest threshold first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_volume_discounts(&self) -> Result<Vec<VolumeDiscount>, RepositoryError> {
        let rows = sqlx::query_as::<_, VolumeDiscount>(&format!(
            "SELECT {VOLUME_COLUMNS} FROM storefront.volume_discount ORDER BY min_quantity, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an active tier already uses the threshold.
    pub async fn create_volume_discount(
        &self,
        fields: VolumeDiscountFields,
    ) -> Result<VolumeDiscount, RepositoryError> {
        sqlx::query_as::<_, VolumeDiscount>(&format!(
            "INSERT INTO storefront.volume_discount (min_quantity, percent, active) \
             VALUES ($1, $2, $3) RETURNING {VOLUME_COLUMNS}"
        ))
        .bind(fields.min_quantity)
        .bind(fields.percent)
        .bind(fields.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "an active tier already uses this quantity"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tier doesn't exist.
    pub async fn update_volume_discount(
        &self,
        id: VolumeDiscountId,
        fields: VolumeDiscountFields,
    ) -> Result<VolumeDiscount, RepositoryError> {
        sqlx::query_as::<_, VolumeDiscount>(&format!(
            "UPDATE storefront.volume_discount SET min_quantity = $2, percent = $3, active = $4 \
             WHERE id = $1 RETURNING {VOLUME_COLUMNS}"
        ))
        .bind(id)
        .bind(fields.min_quantity)
        .bind(fields.percent)
        .bind(fields.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "an active tier already uses this quantity"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tier doesn't exist.
    pub async fn delete_volume_discount(&self, id: VolumeDiscountId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "storefront.volume_discount", id.as_i32()).await
    }

    // =========================================================================
    // Bundles
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_bundles(&self) -> Result<Vec<BundlePricing>, RepositoryError> {
        let rows = sqlx::query_as::<_, BundlePricing>(&format!(
            "SELECT {BUNDLE_COLUMNS} FROM storefront.bundle_pricing ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_bundle(&self, fields: &BundleFields) -> Result<BundlePricing, RepositoryError> {
        sqlx::query_as::<_, BundlePricing>(&format!(
            "INSERT INTO storefront.bundle_pricing (name, product_ids, percent, active) \
             VALUES ($1, $2, $3, $4) RETURNING {BUNDLE_COLUMNS}"
        ))
        .bind(&fields.name)
        .bind(&fields.product_ids)
        .bind(fields.percent)
        .bind(fields.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "invalid bundle"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the bundle doesn't exist.
    pub async fn update_bundle(
        &self,
        id: BundleId,
        fields: &BundleFields,
    ) -> Result<BundlePricing, RepositoryError> {
        sqlx::query_as::<_, BundlePricing>(&format!(
            "UPDATE storefront.bundle_pricing \
             SET name = $2, product_ids = $3, percent = $4, active = $5 \
             WHERE id = $1 RETURNING {BUNDLE_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.product_ids)
        .bind(fields.percent)
        .bind(fields.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "invalid bundle"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the bundle doesn't exist.
    pub async fn delete_bundle(&self, id: BundleId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "storefront.bundle_pricing", id.as_i32()).await
    }

    // =========================================================================
    // Member prices
    // =========================================================================

    /// Member prices, optionally for one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_member_prices(
        &self,
        product_id: Option<&str>,
        page: Page,
    ) -> Result<Vec<MemberPrice>, RepositoryError> {
        let rows = sqlx::query_as::<_, MemberPrice>(&format!(
            "SELECT {MEMBER_PRICE_COLUMNS} FROM storefront.member_price \
             WHERE $1::TEXT IS NULL OR product_id = $1 \
             ORDER BY product_id, variant_id LIMIT $2 OFFSET $3"
        ))
        .bind(product_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert or replace the member price of a variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_member_price(
        &self,
        variant_id: &str,
        product_id: &str,
        price: Decimal,
    ) -> Result<MemberPrice, RepositoryError> {
        let row = sqlx::query_as::<_, MemberPrice>(&format!(
            "INSERT INTO storefront.member_price (variant_id, product_id, price) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (variant_id) DO UPDATE \
                 SET product_id = EXCLUDED.product_id, price = EXCLUDED.price, updated_at = NOW() \
             RETURNING {MEMBER_PRICE_COLUMNS}"
        ))
        .bind(variant_id)
        .bind(product_id)
        .bind(price)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant has no member price.
    pub async fn delete_member_price(&self, variant_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.member_price WHERE variant_id = $1")
            .bind(variant_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Delete one row by integer primary key. `table` is always a literal.
pub(crate) async fn delete_by_id(pool: &PgPool, table: &str, id: i32) -> Result<(), RepositoryError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
