//! Legal documents (terms, privacy, shipping policy).

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tracing::instrument;

use crate::db::LegalDocumentRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Current published version of a document.
///
/// GET /api/legal/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let document = LegalDocumentRepository::new(state.pool())
        .current(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No published document: {slug}")))?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(document),
    ))
}
