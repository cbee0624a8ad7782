//! Dashboard summary.

use axum::{Json, extract::State};

use crate::db::DashboardRepository;
use crate::db::dashboard::DashboardSummary;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// GET /api/admin/dashboard
pub async fn summary(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<DashboardSummary>> {
    Ok(Json(DashboardRepository::new(state.pool()).summary().await?))
}
