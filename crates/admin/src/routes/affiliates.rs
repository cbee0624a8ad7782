//! Affiliate accounts and commission payouts.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use greenleaf_core::models::{Affiliate, AffiliateCommission};
use greenleaf_core::pricing::validate_percent;
use greenleaf_core::promo::normalize_code;
use greenleaf_core::{AffiliateId, CommissionId, CommissionStatus, Email};

use crate::db::affiliates::{AffiliateFields, CommissionTotals};
use crate::db::{AffiliateRepository, Page};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

use super::{non_blank, required};

#[derive(Debug, Deserialize)]
pub struct AffiliateInput {
    pub code: String,
    pub name: String,
    pub email: String,
    /// Percent of the commissionable subtotal; zero tracks without paying.
    pub commission_rate: Decimal,
    pub customer_discount_code: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl AffiliateInput {
    fn into_fields(self) -> Result<AffiliateFields> {
        let commission_rate = if self.commission_rate.is_zero() {
            Decimal::ZERO
        } else {
            validate_percent(self.commission_rate)?
        };
        let email = Email::parse(&self.email)
            .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

        Ok(AffiliateFields {
            code: normalize_code(&self.code)?,
            name: required(&self.name, "name")?,
            email: email.as_str().to_owned(),
            commission_rate,
            customer_discount_code: non_blank(self.customer_discount_code),
            active: self.active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CommissionFilter {
    pub status: Option<CommissionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CommissionReport {
    pub totals: CommissionTotals,
    pub commissions: Vec<AffiliateCommission>,
}

/// Which commissions to pay; empty pays every approved one.
#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidInput {
    #[serde(default)]
    pub commission_ids: Vec<CommissionId>,
}

#[derive(Debug, Serialize)]
pub struct MarkPaidResult {
    pub paid: Vec<AffiliateCommission>,
    pub amount: Decimal,
}

/// GET /api/admin/affiliates
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Affiliate>>> {
    Ok(Json(AffiliateRepository::new(state.pool()).list().await?))
}

/// GET /api/admin/affiliates/{id}
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AffiliateId>,
) -> Result<Json<Affiliate>> {
    AffiliateRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("affiliate not found".into()))
}

/// POST /api/admin/affiliates
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<AffiliateInput>,
) -> Result<(StatusCode, Json<Affiliate>)> {
    let affiliate = AffiliateRepository::new(state.pool())
        .create(&input.into_fields()?)
        .await?;
    info!(id = %affiliate.id, code = %affiliate.code, "Affiliate created");
    Ok((StatusCode::CREATED, Json(affiliate)))
}

/// PUT /api/admin/affiliates/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<AffiliateId>,
    Json(input): Json<AffiliateInput>,
) -> Result<Json<Affiliate>> {
    let affiliate = AffiliateRepository::new(state.pool())
        .update(id, &input.into_fields()?)
        .await?;
    info!(code = %affiliate.code, active = affiliate.active, "Affiliate updated");
    Ok(Json(affiliate))
}

/// DELETE /api/admin/affiliates/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<AffiliateId>,
) -> Result<StatusCode> {
    AffiliateRepository::new(state.pool()).delete(id).await?;
    info!("Affiliate deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/affiliates/{id}/commissions?status=
pub async fn commissions(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AffiliateId>,
    Query(filter): Query<CommissionFilter>,
) -> Result<Json<CommissionReport>> {
    let repo = AffiliateRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound("affiliate not found".into()));
    }

    let commissions = repo
        .list_commissions(id, filter.status, Page::new(filter.limit, filter.offset))
        .await?;
    let totals = repo.commission_totals(id).await?;
    Ok(Json(CommissionReport {
        totals,
        commissions,
    }))
}

/// POST /api/admin/affiliates/{id}/commissions/mark-paid
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn mark_paid(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<AffiliateId>,
    Json(input): Json<MarkPaidInput>,
) -> Result<Json<MarkPaidResult>> {
    let repo = AffiliateRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound("affiliate not found".into()));
    }

    let paid = repo.mark_paid(id, &input.commission_ids).await?;
    let amount = paid.iter().map(|c| c.amount).sum();
    info!(count = paid.len(), %amount, "Commissions marked paid");
    Ok(Json(MarkPaidResult { paid, amount }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AffiliateInput {
        AffiliateInput {
            code: " leafy-friends ".into(),
            name: "Leafy Friends".into(),
            email: "Partners@Leafy.Example".into(),
            commission_rate: Decimal::new(125, 1),
            customer_discount_code: Some("  ".into()),
            active: true,
        }
    }

    #[test]
    fn test_affiliate_input_normalized() {
        let fields = input().into_fields().unwrap();
        assert_eq!(fields.code, "LEAFY-FRIENDS");
        assert_eq!(fields.email, "Partners@leafy.example");
        assert_eq!(fields.customer_discount_code, None);
    }

    #[test]
    fn test_zero_rate_allowed_but_not_over_hundred() {
        let zero = AffiliateInput {
            commission_rate: Decimal::ZERO,
            ..input()
        };
        assert_eq!(zero.into_fields().unwrap().commission_rate, Decimal::ZERO);

        let over = AffiliateInput {
            commission_rate: Decimal::new(150, 0),
            ..input()
        };
        assert!(matches!(over.into_fields(), Err(AppError::Pricing(_))));
    }

    #[test]
    fn test_mark_paid_body_optional_ids() {
        let input: MarkPaidInput = serde_json::from_str("{}").unwrap();
        assert!(input.commission_ids.is_empty());
        let input: MarkPaidInput = serde_json::from_str(r#"{"commission_ids":[3,4]}"#).unwrap();
        assert_eq!(input.commission_ids, vec![CommissionId::new(3), CommissionId::new(4)]);
    }
}
