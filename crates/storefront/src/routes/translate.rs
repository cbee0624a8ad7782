//! Translation on demand.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Translation request body.
#[derive(Debug, Deserialize)]
pub struct TranslateInput {
    pub text: String,
    /// BCP 47 tag, e.g. `fr` or `pt-BR`.
    pub target_language: String,
}

/// Translated text.
#[derive(Debug, Serialize)]
pub struct TranslateOutput {
    pub translation: String,
    pub target_language: String,
}

/// Translate product copy or a review.
///
/// POST /api/translate
#[instrument(skip(state, input), fields(target_language = %input.target_language))]
pub async fn translate(
    State(state): State<AppState>,
    Json(input): Json<TranslateInput>,
) -> Result<Json<TranslateOutput>> {
    let translator = state
        .translation()
        .ok_or_else(|| AppError::ServiceUnavailable("Translation is not available".to_owned()))?;

    let translation = translator
        .translate(&input.text, &input.target_language)
        .await?;

    Ok(Json(TranslateOutput {
        translation,
        target_language: input.target_language.trim().to_owned(),
    }))
}
