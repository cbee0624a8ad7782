//! Product review handlers.
//!
//! Reviews are keyed by Shopify product GID and start out pending until a
//! moderator approves them in the back office.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use greenleaf_core::models::Review;

use crate::db::reviews::{NewReview, RatingSummary};
use crate::db::{ReviewRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;
const MAX_TITLE_CHARS: usize = 120;
const MAX_BODY_CHARS: usize = 5_000;
const MAX_AUTHOR_CHARS: usize = 60;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Approved reviews with their summary.
#[derive(Debug, Serialize)]
pub struct ReviewPage {
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

/// Approved reviews for a product.
///
/// GET /api/products/{handle}/reviews
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ReviewPage>> {
    let product = state.storefront().get_product_by_handle(&handle).await?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let repo = ReviewRepository::new(state.pool());
    let summary = repo.summary(&product.id).await?;
    let reviews = repo.list_approved(&product.id, limit, offset).await?;

    Ok(Json(ReviewPage { summary, reviews }))
}

/// Review submission body.
#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
    /// Shown instead of the member's display name.
    pub author_name: Option<String>,
}

/// A review checked and trimmed.
#[derive(Debug, PartialEq, Eq)]
struct CheckedReview {
    rating: i16,
    title: Option<String>,
    body: String,
    author_name: Option<String>,
}

impl ReviewInput {
    fn check(self) -> std::result::Result<CheckedReview, String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_owned());
        }

        let body = self.body.trim().to_owned();
        if body.is_empty() || body.chars().count() > MAX_BODY_CHARS {
            return Err(format!("review must be between 1 and {MAX_BODY_CHARS} characters"));
        }

        let title = non_blank(self.title);
        if title.as_ref().is_some_and(|t| t.chars().count() > MAX_TITLE_CHARS) {
            return Err(format!("title must be at most {MAX_TITLE_CHARS} characters"));
        }

        let author_name = non_blank(self.author_name);
        if author_name.as_ref().is_some_and(|a| a.chars().count() > MAX_AUTHOR_CHARS) {
            return Err(format!("name must be at most {MAX_AUTHOR_CHARS} characters"));
        }

        Ok(CheckedReview {
            rating: self.rating,
            title,
            body,
            author_name,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Submit a review for moderation.
///
/// POST /api/products/{handle}/reviews
#[instrument(skip(state, current_user, input), fields(user_id = %current_user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    Path(handle): Path<String>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = input.check().map_err(AppError::BadRequest)?;
    let product = state.storefront().get_product_by_handle(&handle).await?;

    let author_name = match review.author_name {
        Some(name) => name,
        None => UserRepository::new(state.pool())
            .get_by_id(current_user.id)
            .await?
            .and_then(|user| user.display_name)
            .unwrap_or_else(|| "Greenleaf member".to_owned()),
    };

    let created = ReviewRepository::new(state.pool())
        .create(&NewReview {
            product_id: &product.id,
            user_id: current_user.id,
            author_name: &author_name,
            rating: review.rating,
            title: review.title.as_deref(),
            body: &review.body,
        })
        .await?;

    add_breadcrumb("reviews", "Submitted review", Some(&[("product", &handle)]));
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(rating: i16, body: &str) -> ReviewInput {
        ReviewInput {
            rating,
            title: None,
            body: body.to_owned(),
            author_name: None,
        }
    }

    #[test]
    fn test_review_rating_range() {
        assert!(input(0, "ok").check().is_err());
        assert!(input(6, "ok").check().is_err());
        assert_eq!(input(5, "  Lovely fern  ").check().unwrap().body, "Lovely fern");
    }

    #[test]
    fn test_review_body_required() {
        assert!(input(4, "   ").check().is_err());
        assert!(input(4, &"a".repeat(MAX_BODY_CHARS + 1)).check().is_err());
    }

    #[test]
    fn test_review_blank_optional_fields_are_dropped() {
        let review = ReviewInput {
            rating: 3,
            title: Some("  ".to_owned()),
            body: "Fine".to_owned(),
            author_name: Some(" Robin ".to_owned()),
        }
        .check()
        .unwrap();
        assert_eq!(review.title, None);
        assert_eq!(review.author_name.as_deref(), Some("Robin"));
    }
}
