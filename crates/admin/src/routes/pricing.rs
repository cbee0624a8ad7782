//! Volume tiers, bundles and member prices.
//!
//! Input goes through the same checks the cart engine applies when it loads
//! rules, so nothing saved here is skipped at pricing time.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use greenleaf_core::models::{BundlePricing, MemberPrice, VolumeDiscount};
use greenleaf_core::pricing::{PricingError, VolumeTier, validate_percent};
use greenleaf_core::{BundleId, VolumeDiscountId};

use crate::db::{Page, PricingRepository};
use crate::db::pricing::{BundleFields, VolumeDiscountFields};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

use super::required;

const fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct VolumeDiscountInput {
    pub min_quantity: u32,
    pub percent: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl VolumeDiscountInput {
    fn into_fields(self) -> Result<VolumeDiscountFields> {
        let tier = VolumeTier::new(self.min_quantity, self.percent)?;
        let min_quantity =
            i32::try_from(tier.min_quantity).map_err(|_| PricingError::InvalidQuantity)?;
        Ok(VolumeDiscountFields {
            min_quantity,
            percent: tier.percent,
            active: self.active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BundleInput {
    pub name: String,
    pub product_ids: Vec<String>,
    pub percent: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl BundleInput {
    /// Trims ids and drops duplicates, keeping first-seen order.
    fn into_fields(self) -> Result<BundleFields> {
        let name = required(&self.name, "name")?;
        let mut product_ids: Vec<String> = Vec::with_capacity(self.product_ids.len());
        for id in self.product_ids {
            let id = id.trim();
            if !id.is_empty() && !product_ids.iter().any(|seen| seen == id) {
                product_ids.push(id.to_owned());
            }
        }
        if product_ids.len() < 2 {
            return Err(PricingError::BundleTooSmall.into());
        }
        Ok(BundleFields {
            name,
            product_ids,
            percent: validate_percent(self.percent)?,
            active: self.active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MemberPriceInput {
    pub variant_id: String,
    pub product_id: String,
    pub price: Decimal,
}

/// Query strings can't use `#[serde(flatten)]` with numbers, so paging is
/// repeated here.
#[derive(Debug, Deserialize)]
pub struct MemberPriceFilter {
    pub product_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub variant_id: String,
}

// =============================================================================
// Volume discounts
// =============================================================================

/// GET /api/admin/volume-discounts
pub async fn list_volume_discounts(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<VolumeDiscount>>> {
    Ok(Json(
        PricingRepository::new(state.pool())
            .list_volume_discounts()
            .await?,
    ))
}

/// POST /api/admin/volume-discounts
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_volume_discount(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<VolumeDiscountInput>,
) -> Result<(StatusCode, Json<VolumeDiscount>)> {
    let tier = PricingRepository::new(state.pool())
        .create_volume_discount(input.into_fields()?)
        .await?;
    info!(id = %tier.id, min_quantity = tier.min_quantity, "Volume tier created");
    Ok((StatusCode::CREATED, Json(tier)))
}

/// PUT /api/admin/volume-discounts/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn update_volume_discount(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<VolumeDiscountId>,
    Json(input): Json<VolumeDiscountInput>,
) -> Result<Json<VolumeDiscount>> {
    let tier = PricingRepository::new(state.pool())
        .update_volume_discount(id, input.into_fields()?)
        .await?;
    info!("Volume tier updated");
    Ok(Json(tier))
}

/// DELETE /api/admin/volume-discounts/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn delete_volume_discount(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<VolumeDiscountId>,
) -> Result<StatusCode> {
    PricingRepository::new(state.pool())
        .delete_volume_discount(id)
        .await?;
    info!("Volume tier deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Bundles
// =============================================================================

/// GET /api/admin/bundles
pub async fn list_bundles(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<BundlePricing>>> {
    Ok(Json(PricingRepository::new(state.pool()).list_bundles().await?))
}

/// POST /api/admin/bundles
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_bundle(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<BundleInput>,
) -> Result<(StatusCode, Json<BundlePricing>)> {
    let bundle = PricingRepository::new(state.pool())
        .create_bundle(&input.into_fields()?)
        .await?;
    info!(id = %bundle.id, name = %bundle.name, "Bundle created");
    Ok((StatusCode::CREATED, Json(bundle)))
}

/// PUT /api/admin/bundles/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn update_bundle(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<BundleId>,
    Json(input): Json<BundleInput>,
) -> Result<Json<BundlePricing>> {
    let bundle = PricingRepository::new(state.pool())
        .update_bundle(id, &input.into_fields()?)
        .await?;
    info!("Bundle updated");
    Ok(Json(bundle))
}

/// DELETE /api/admin/bundles/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn delete_bundle(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<BundleId>,
) -> Result<StatusCode> {
    PricingRepository::new(state.pool()).delete_bundle(id).await?;
    info!("Bundle deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Member prices
// =============================================================================

/// GET /api/admin/member-prices?product_id=
pub async fn list_member_prices(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filter): Query<MemberPriceFilter>,
) -> Result<Json<Vec<MemberPrice>>> {
    let product_id = filter.product_id.as_deref().map(str::trim).filter(|p| !p.is_empty());
    Ok(Json(
        PricingRepository::new(state.pool())
            .list_member_prices(product_id, Page::new(filter.limit, filter.offset))
            .await?,
    ))
}

/// PUT /api/admin/member-prices
///
/// Variant ids are Shopify GIDs, which contain slashes, so they travel in
/// the body rather than the path.
#[instrument(skip_all, fields(admin_id = %admin.id, variant_id = %input.variant_id))]
pub async fn upsert_member_price(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<MemberPriceInput>,
) -> Result<Json<MemberPrice>> {
    let variant_id = required(&input.variant_id, "variant_id")?;
    let product_id = required(&input.product_id, "product_id")?;
    if input.price <= Decimal::ZERO {
        return Err(PricingError::InvalidPrice.into());
    }

    let price = PricingRepository::new(state.pool())
        .upsert_member_price(&variant_id, &product_id, input.price.round_dp(2))
        .await?;
    info!(price = %price.price, "Member price saved");
    Ok(Json(price))
}

/// DELETE /api/admin/member-prices?variant_id=
#[instrument(skip_all, fields(admin_id = %admin.id, variant_id = %query.variant_id))]
pub async fn delete_member_price(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Query(query): Query<VariantQuery>,
) -> Result<StatusCode> {
    let variant_id = query.variant_id.trim();
    if variant_id.is_empty() {
        return Err(AppError::BadRequest("variant_id cannot be empty".into()));
    }
    PricingRepository::new(state.pool())
        .delete_member_price(variant_id)
        .await?;
    info!("Member price removed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_input_validated() {
        let ok = VolumeDiscountInput {
            min_quantity: 3,
            percent: Decimal::new(15, 0),
            active: true,
        };
        assert_eq!(ok.into_fields().unwrap().min_quantity, 3);

        let zero = VolumeDiscountInput {
            min_quantity: 0,
            percent: Decimal::TEN,
            active: true,
        };
        assert!(matches!(
            zero.into_fields(),
            Err(AppError::Pricing(PricingError::InvalidQuantity))
        ));

        let over = VolumeDiscountInput {
            min_quantity: 2,
            percent: Decimal::new(101, 0),
            active: true,
        };
        assert!(matches!(
            over.into_fields(),
            Err(AppError::Pricing(PricingError::InvalidPercent(_)))
        ));
    }

    #[test]
    fn test_bundle_dedupes_products() {
        let input = BundleInput {
            name: " Starter kit ".into(),
            product_ids: vec![
                "gid://shopify/Product/1".into(),
                " gid://shopify/Product/1 ".into(),
                "gid://shopify/Product/2".into(),
            ],
            percent: Decimal::TEN,
            active: true,
        };
        let fields = input.into_fields().unwrap();
        assert_eq!(fields.name, "Starter kit");
        assert_eq!(
            fields.product_ids,
            vec!["gid://shopify/Product/1", "gid://shopify/Product/2"]
        );
    }

    #[test]
    fn test_bundle_needs_two_distinct_products() {
        let input = BundleInput {
            name: "Solo".into(),
            product_ids: vec!["gid://shopify/Product/1".into(), "gid://shopify/Product/1".into()],
            percent: Decimal::TEN,
            active: true,
        };
        assert!(matches!(
            input.into_fields(),
            Err(AppError::Pricing(PricingError::BundleTooSmall))
        ));
    }

    #[test]
    fn test_volume_input_defaults_active() {
        let input: VolumeDiscountInput =
            serde_json::from_str(r#"{"min_quantity":5,"percent":"10"}"#).unwrap();
        assert!(input.active);
    }
}
