//! Collection route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::shopify::{Collection, MAX_PAGE_SIZE};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 24;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub first: Option<i64>,
    pub after: Option<String>,
}

/// A collection with one page of its products.
///
/// GET /api/collections/{handle}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection>> {
    let first = query.first.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let after = query.after.filter(|a| !a.is_empty());

    let collection = state
        .storefront()
        .get_collection_by_handle(&handle, first, after)
        .await?;
    Ok(Json(collection))
}
