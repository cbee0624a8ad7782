//! Influencer codes and their redemption history.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use greenleaf_core::models::{Influencer, InfluencerRedemption};
use greenleaf_core::pricing::validate_percent;
use greenleaf_core::promo::normalize_code;
use greenleaf_core::{Email, InfluencerId};

use crate::db::InfluencerRepository;
use crate::db::influencers::InfluencerFields;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

use super::{PageQuery, non_blank, required};

#[derive(Debug, Deserialize)]
pub struct InfluencerInput {
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub discount_percent: Decimal,
    /// Variant added free to the cart while the code is applied.
    pub free_product_variant_id: Option<String>,
    pub max_uses: Option<i32>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

impl InfluencerInput {
    /// A code must give something: a percentage, a free product, or both.
    fn into_fields(self) -> Result<InfluencerFields> {
        let free_product_variant_id = non_blank(self.free_product_variant_id);
        let discount_percent = if self.discount_percent.is_zero() {
            if free_product_variant_id.is_none() {
                return Err(AppError::BadRequest(
                    "a code needs a discount percent or a free product".into(),
                ));
            }
            Decimal::ZERO
        } else {
            validate_percent(self.discount_percent)?
        };

        if let (Some(starts), Some(expires)) = (self.starts_at, self.expires_at) {
            if starts >= expires {
                return Err(AppError::BadRequest(
                    "starts_at must be before expires_at".into(),
                ));
            }
        }
        if self.max_uses.is_some_and(|max| max <= 0) {
            return Err(AppError::BadRequest("max_uses must be positive".into()));
        }

        let email = non_blank(self.email)
            .map(|raw| {
                Email::parse(&raw)
                    .map(Email::into_inner)
                    .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))
            })
            .transpose()?;

        Ok(InfluencerFields {
            code: normalize_code(&self.code)?,
            name: required(&self.name, "name")?,
            email,
            discount_percent,
            free_product_variant_id,
            max_uses: self.max_uses,
            active: self.active,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
        })
    }
}

/// GET /api/admin/influencers
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Influencer>>> {
    Ok(Json(InfluencerRepository::new(state.pool()).list().await?))
}

/// GET /api/admin/influencers/{id}
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<InfluencerId>,
) -> Result<Json<Influencer>> {
    InfluencerRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("influencer not found".into()))
}

/// POST /api/admin/influencers
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<InfluencerInput>,
) -> Result<(StatusCode, Json<Influencer>)> {
    let influencer = InfluencerRepository::new(state.pool())
        .create(&input.into_fields()?)
        .await?;
    info!(id = %influencer.id, code = %influencer.code, "Influencer code created");
    Ok((StatusCode::CREATED, Json(influencer)))
}

/// PUT /api/admin/influencers/{id}
///
/// Lowering `max_uses` below the current count is refused by the database.
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<InfluencerId>,
    Json(input): Json<InfluencerInput>,
) -> Result<Json<Influencer>> {
    let influencer = InfluencerRepository::new(state.pool())
        .update(id, &input.into_fields()?)
        .await?;
    info!(code = %influencer.code, active = influencer.active, "Influencer code updated");
    Ok(Json(influencer))
}

/// DELETE /api/admin/influencers/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<InfluencerId>,
) -> Result<StatusCode> {
    InfluencerRepository::new(state.pool()).delete(id).await?;
    info!("Influencer code deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/influencers/{id}/redemptions
pub async fn redemptions(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<InfluencerId>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<InfluencerRedemption>>> {
    let repo = InfluencerRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound("influencer not found".into()));
    }
    Ok(Json(repo.list_redemptions(id, page.page()).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn input() -> InfluencerInput {
        InfluencerInput {
            code: "mossy".into(),
            name: "Mossy Mornings".into(),
            email: None,
            discount_percent: Decimal::new(15, 0),
            free_product_variant_id: None,
            max_uses: Some(200),
            active: true,
            starts_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_influencer_input_normalized() {
        let fields = InfluencerInput {
            email: Some("  ".into()),
            ..input()
        }
        .into_fields()
        .unwrap();
        assert_eq!(fields.code, "MOSSY");
        assert_eq!(fields.email, None);
    }

    #[test]
    fn test_free_product_only_code() {
        let fields = InfluencerInput {
            discount_percent: Decimal::ZERO,
            free_product_variant_id: Some("gid://shopify/ProductVariant/9".into()),
            ..input()
        }
        .into_fields()
        .unwrap();
        assert_eq!(fields.discount_percent, Decimal::ZERO);

        let nothing = InfluencerInput {
            discount_percent: Decimal::ZERO,
            ..input()
        };
        assert!(matches!(nothing.into_fields(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_window_and_limits() {
        let now = Utc::now();
        let backwards = InfluencerInput {
            starts_at: Some(now),
            expires_at: Some(now - Duration::days(1)),
            ..input()
        };
        assert!(matches!(backwards.into_fields(), Err(AppError::BadRequest(_))));

        let zero_uses = InfluencerInput {
            max_uses: Some(0),
            ..input()
        };
        assert!(matches!(zero_uses.into_fields(), Err(AppError::BadRequest(_))));

        let over = InfluencerInput {
            discount_percent: Decimal::new(120, 0),
            ..input()
        };
        assert!(matches!(over.into_fields(), Err(AppError::Pricing(_))));
    }
}
