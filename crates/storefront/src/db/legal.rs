//! Versioned legal documents.

use sqlx::PgPool;

use greenleaf_core::models::LegalDocument;

use super::RepositoryError;

pub struct LegalDocumentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LegalDocumentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Highest published version of a document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current(&self, slug: &str) -> Result<Option<LegalDocument>, RepositoryError> {
        let document = sqlx::query_as::<_, LegalDocument>(
            r"
            SELECT id, slug, title, body, version, published_at, created_at
            FROM storefront.legal_document
            WHERE slug = $1 AND published_at IS NOT NULL AND published_at <= NOW()
            ORDER BY version DESC
            LIMIT 1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }
}
