//! Email templates and legal documents.

use sqlx::PgPool;

use greenleaf_core::models::{EmailTemplate, LegalDocument};
use greenleaf_core::{EmailTemplateId, LegalDocumentId};

use super::pricing::delete_by_id;
use super::{RepositoryError, conflict_on_constraint};

const TEMPLATE_COLUMNS: &str = "id, key, subject, html_body, text_body, updated_at";
const LEGAL_COLUMNS: &str = "id, slug, title, body, version, published_at, created_at";

/// Fields of an email template.
#[derive(Debug, Clone)]
pub struct EmailTemplateFields {
    pub key: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

pub struct EmailTemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailTemplateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<EmailTemplate>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmailTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM storefront.email_template ORDER BY key"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: EmailTemplateId) -> Result<Option<EmailTemplate>, RepositoryError> {
        let row = sqlx::query_as::<_, EmailTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM storefront.email_template WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key is taken.
    pub async fn create(&self, fields: &EmailTemplateFields) -> Result<EmailTemplate, RepositoryError> {
        sqlx::query_as::<_, EmailTemplate>(&format!(
            "INSERT INTO storefront.email_template (key, subject, html_body, text_body) \
             VALUES ($1, $2, $3, $4) RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(&fields.key)
        .bind(&fields.subject)
        .bind(&fields.html_body)
        .bind(&fields.text_body)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "a template with this key already exists"))
    }

    /// Insert or replace the template with `fields.key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(&self, fields: &EmailTemplateFields) -> Result<EmailTemplate, RepositoryError> {
        let row = sqlx::query_as::<_, EmailTemplate>(&format!(
            "INSERT INTO storefront.email_template (key, subject, html_body, text_body) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (key) DO UPDATE SET subject = EXCLUDED.subject, \
                 html_body = EXCLUDED.html_body, text_body = EXCLUDED.text_body, \
                 updated_at = NOW() \
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(&fields.key)
        .bind(&fields.subject)
        .bind(&fields.html_body)
        .bind(&fields.text_body)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template doesn't exist.
    pub async fn update(
        &self,
        id: EmailTemplateId,
        fields: &EmailTemplateFields,
    ) -> Result<EmailTemplate, RepositoryError> {
        sqlx::query_as::<_, EmailTemplate>(&format!(
            "UPDATE storefront.email_template \
             SET key = $2, subject = $3, html_body = $4, text_body = $5, updated_at = NOW() \
             WHERE id = $1 RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.key)
        .bind(&fields.subject)
        .bind(&fields.html_body)
        .bind(&fields.text_body)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "a template with this key already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a template; the storefront falls back to its built-in version.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template doesn't exist.
    pub async fn delete(&self, id: EmailTemplateId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "storefront.email_template", id.as_i32()).await
    }
}

pub struct LegalDocumentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LegalDocumentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every version, grouped by slug, newest version first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, slug: Option<&str>) -> Result<Vec<LegalDocument>, RepositoryError> {
        let rows = sqlx::query_as::<_, LegalDocument>(&format!(
            "SELECT {LEGAL_COLUMNS} FROM storefront.legal_document \
             WHERE $1::TEXT IS NULL OR slug = $1 \
             ORDER BY slug, version DESC"
        ))
        .bind(slug)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Add a draft as the next version of `slug`.
    ///
    /// Two concurrent drafts for one slug collide on `(slug, version)`; the
    /// loser gets `Conflict` and can retry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a version race.
    pub async fn create_version(
        &self,
        slug: &str,
        title: &str,
        body: &str,
    ) -> Result<LegalDocument, RepositoryError> {
        sqlx::query_as::<_, LegalDocument>(&format!(
            "INSERT INTO storefront.legal_document (slug, title, body, version) \
             SELECT $1, $2, $3, COALESCE(MAX(version), 0) + 1 \
             FROM storefront.legal_document WHERE slug = $1 \
             RETURNING {LEGAL_COLUMNS}"
        ))
        .bind(slug)
        .bind(title)
        .bind(body)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "another version was created concurrently"))
    }

    /// Publish a draft now. Publishing twice keeps the first timestamp.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the document doesn't exist.
    pub async fn publish(&self, id: LegalDocumentId) -> Result<LegalDocument, RepositoryError> {
        sqlx::query_as::<_, LegalDocument>(&format!(
            "UPDATE storefront.legal_document \
             SET published_at = COALESCE(published_at, NOW()) \
             WHERE id = $1 RETURNING {LEGAL_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
