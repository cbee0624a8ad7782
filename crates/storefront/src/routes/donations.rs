//! Public donation totals and feed.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::DonationRepository;
use crate::db::donations::{DonationSummary, PublicDonation};
use crate::error::Result;
use crate::state::AppState;

const DEFAULT_RECENT: i64 = 20;
const MAX_RECENT: i64 = 100;

/// Running donation totals.
///
/// GET /api/donations/summary
#[instrument(skip(state))]
pub async fn summary(State(state): State<AppState>) -> Result<Json<DonationSummary>> {
    Ok(Json(DonationRepository::new(state.pool()).summary().await?))
}

/// Recent donation query parameters.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Most recent donations, newest first.
///
/// GET /api/donations/recent
#[instrument(skip(state))]
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<PublicDonation>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);
    Ok(Json(DonationRepository::new(state.pool()).recent(limit).await?))
}
