//! Storefront API passthrough for browser GraphQL clients.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::shopify::{ProxyRequest, proxy};
use crate::state::AppState;

/// Forward a read-only GraphQL document to Shopify.
///
/// POST /api/storefront/graphql
#[instrument(skip(state, request), fields(operation = ?request.operation_name))]
pub async fn graphql(
    State(state): State<AppState>,
    Json(request): Json<ProxyRequest>,
) -> Result<Json<serde_json::Value>> {
    proxy::validate(&request)?;
    let response = state.storefront().proxy(&request).await?;
    Ok(Json(response))
}
