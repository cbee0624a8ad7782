//! Review moderation.

use sqlx::PgPool;

use greenleaf_core::models::Review;
use greenleaf_core::{ReviewId, ReviewStatus};

use super::pricing::delete_by_id;
use super::{Page, RepositoryError};

const COLUMNS: &str = "id, product_id, user_id, author_name, rating, title, body, status, created_at";

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews in a status; the oldest pending ones come first so the
    /// queue is worked in order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_status(
        &self,
        status: ReviewStatus,
        page: Page,
    ) -> Result<Vec<Review>, RepositoryError> {
        let order = if status == ReviewStatus::Pending {
            "ASC"
        } else {
            "DESC"
        };
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {COLUMNS} FROM storefront.review WHERE status = $1 \
             ORDER BY created_at {order}, id {order} LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Move a review to `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn set_status(&self, id: ReviewId, status: ReviewStatus) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE storefront.review SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "storefront.review", id.as_i32()).await
    }
}
