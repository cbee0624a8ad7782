//! Review moderation queue.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use greenleaf_core::models::Review;
use greenleaf_core::{ReviewId, ReviewStatus};

use crate::db::{Page, ReviewRepository};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReviewFilter {
    /// Defaults to the pending queue.
    #[serde(default)]
    pub status: ReviewStatus,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/reviews?status=pending
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filter): Query<ReviewFilter>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(
        ReviewRepository::new(state.pool())
            .list_by_status(filter.status, Page::new(filter.limit, filter.offset))
            .await?,
    ))
}

/// POST /api/admin/reviews/{id}/approve
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn approve(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, ReviewStatus::Approved)
        .await?;
    info!(product_id = %review.product_id, "Review approved");
    Ok(Json(review))
}

/// POST /api/admin/reviews/{id}/reject
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn reject(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, ReviewStatus::Rejected)
        .await?;
    info!(product_id = %review.product_id, "Review rejected");
    Ok(Json(review))
}

/// DELETE /api/admin/reviews/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewRepository::new(state.pool()).delete(id).await?;
    info!("Review deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_pending() {
        let uri: axum::http::Uri = "/api/admin/reviews".parse().unwrap();
        let Query(filter) = Query::<ReviewFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.status, ReviewStatus::Pending);

        let uri: axum::http::Uri = "/api/admin/reviews?status=rejected&limit=5".parse().unwrap();
        let Query(filter) = Query::<ReviewFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.status, ReviewStatus::Rejected);
        assert_eq!(filter.limit, Some(5));
    }
}
