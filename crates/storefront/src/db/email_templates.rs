//! Email templates edited in the back-office.

use sqlx::PgPool;

use greenleaf_core::models::EmailTemplate;

use super::RepositoryError;

pub struct EmailTemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailTemplateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Template stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<EmailTemplate>, RepositoryError> {
        let template = sqlx::query_as::<_, EmailTemplate>(
            r"
            SELECT id, key, subject, html_body, text_body, updated_at
            FROM storefront.email_template
            WHERE key = $1
            ",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(template)
    }
}
