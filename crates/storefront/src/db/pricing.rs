//! Discount rules and member prices.

use sqlx::PgPool;

use greenleaf_core::models::{BundlePricing, MemberPrice, VolumeDiscount};

use super::RepositoryError;

/// Read access to the rules behind the cart discount engine.
pub struct PricingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PricingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active volume tiers, lowest threshold first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_volume_discounts(&self) -> Result<Vec<VolumeDiscount>, RepositoryError> {
        let rows = sqlx::query_as::<_, VolumeDiscount>(
            r"
            SELECT id, min_quantity, percent, active, created_at
            FROM storefront.volume_discount
            WHERE active
            ORDER BY min_quantity
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Active bundles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_bundles(&self) -> Result<Vec<BundlePricing>, RepositoryError> {
        let rows = sqlx::query_as::<_, BundlePricing>(
            r"
            SELECT id, name, product_ids, percent, active, created_at
            FROM storefront.bundle_pricing
            WHERE active
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Member prices for the given variant GIDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn member_prices_for_variants(
        &self,
        variant_ids: &[String],
    ) -> Result<Vec<MemberPrice>, RepositoryError> {
        if variant_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, MemberPrice>(
            r"
            SELECT variant_id, product_id, price, updated_at
            FROM storefront.member_price
            WHERE variant_id = ANY($1)
            ",
        )
        .bind(variant_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Member prices for every variant of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn member_prices_for_product(
        &self,
        product_id: &str,
    ) -> Result<Vec<MemberPrice>, RepositoryError> {
        let rows = sqlx::query_as::<_, MemberPrice>(
            r"
            SELECT variant_id, product_id, price, updated_at
            FROM storefront.member_price
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
