//! Product reviews.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use greenleaf_core::UserId;
use greenleaf_core::models::Review;

use super::{RepositoryError, conflict_on_unique};

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, author_name, rating, title, body, status, created_at";

/// Approved review count and average rating for a product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub count: i64,
    /// `None` when there are no approved reviews.
    pub average: Option<Decimal>,
}

/// A review submitted by a member.
#[derive(Debug, Clone)]
pub struct NewReview<'a> {
    pub product_id: &'a str,
    pub user_id: UserId,
    pub author_name: &'a str,
    pub rating: i16,
    pub title: Option<&'a str>,
    pub body: &'a str,
}

/// Repository for reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Approved reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_approved(
        &self,
        product_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM storefront.review \
             WHERE product_id = $1 AND status = 'approved' \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// Rating summary over approved reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, product_id: &str) -> Result<RatingSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            r"
            SELECT COUNT(*) AS count, ROUND(AVG(rating)::NUMERIC, 2) AS average
            FROM storefront.review
            WHERE product_id = $1 AND status = 'approved'
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }

    /// Store a new review awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the member already reviewed the product.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO storefront.review (product_id, user_id, author_name, rating, title, body) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.author_name)
        .bind(review.rating)
        .bind(review.title)
        .bind(review.body)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product already reviewed"))
    }
}
