//! Email templates and legal documents.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use greenleaf_core::models::{EmailTemplate, LegalDocument};
use greenleaf_core::{Email, EmailTemplateId, LegalDocumentId};

use crate::db::content::EmailTemplateFields;
use crate::db::{EmailTemplateRepository, LegalDocumentRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::services::RenderedTemplate;
use crate::state::AppState;

use super::{non_blank, required};

const MAX_KEY_LENGTH: usize = 64;

/// Template keys and legal slugs: lowercase ASCII, digits, `_` and `-`.
fn identifier(value: &str, field: &str) -> Result<String> {
    let value = required(value, field)?;
    let valid = value.len() <= MAX_KEY_LENGTH
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if !valid {
        return Err(AppError::BadRequest(format!(
            "{field} may only contain lowercase letters, digits, '_' and '-' (max {MAX_KEY_LENGTH})"
        )));
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
pub struct TemplateInput {
    pub key: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl TemplateInput {
    fn into_fields(self) -> Result<EmailTemplateFields> {
        let html_body = self.html_body.trim().to_owned();
        let text_body = self.text_body.trim().to_owned();
        if html_body.is_empty() && text_body.is_empty() {
            return Err(AppError::BadRequest(
                "a template needs an HTML or a text body".into(),
            ));
        }
        Ok(EmailTemplateFields {
            key: identifier(&self.key, "key")?,
            subject: required(&self.subject, "subject")?,
            html_body,
            text_body,
        })
    }
}

/// Recipient for a test send; defaults to the signed-in admin.
#[derive(Debug, Default, Deserialize)]
pub struct SendTestInput {
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegalFilter {
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegalInput {
    pub slug: String,
    pub title: String,
    pub body: String,
}

// =============================================================================
// Email templates
// =============================================================================

/// GET /api/admin/email-templates
pub async fn list_templates(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<EmailTemplate>>> {
    Ok(Json(EmailTemplateRepository::new(state.pool()).list().await?))
}

/// GET /api/admin/email-templates/{id}
pub async fn show_template(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<EmailTemplateId>,
) -> Result<Json<EmailTemplate>> {
    EmailTemplateRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("template not found".into()))
}

/// POST /api/admin/email-templates
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_template(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<TemplateInput>,
) -> Result<(StatusCode, Json<EmailTemplate>)> {
    let template = EmailTemplateRepository::new(state.pool())
        .create(&input.into_fields()?)
        .await?;
    info!(key = %template.key, "Email template created");
    Ok((StatusCode::CREATED, Json(template)))
}

/// PUT /api/admin/email-templates/{id}
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn update_template(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<EmailTemplateId>,
    Json(input): Json<TemplateInput>,
) -> Result<Json<EmailTemplate>> {
    let template = EmailTemplateRepository::new(state.pool())
        .update(id, &input.into_fields()?)
        .await?;
    info!(key = %template.key, "Email template updated");
    Ok(Json(template))
}

/// DELETE /api/admin/email-templates/{id}
///
/// The storefront falls back to its built-in copy for a deleted key.
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn delete_template(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<EmailTemplateId>,
) -> Result<StatusCode> {
    EmailTemplateRepository::new(state.pool()).delete(id).await?;
    info!("Email template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/email-templates/{id}/test
///
/// Renders the template with `[name]` sample values and mails it. Returns
/// the rendered copy so the caller can preview it.
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn send_test(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<EmailTemplateId>,
    body: Option<Json<SendTestInput>>,
) -> Result<Json<RenderedTemplate>> {
    let template = EmailTemplateRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("template not found".into()))?;

    let to = match body.and_then(|Json(input)| non_blank(input.to)) {
        Some(raw) => {
            Email::parse(&raw).map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?
        }
        None => admin.email.clone(),
    };

    let rendered = state.email().send_test(&template, &to).await?;
    info!(key = %template.key, to = %to.masked(), "Test email sent");
    Ok(Json(rendered))
}

// =============================================================================
// Legal documents
// =============================================================================

/// GET /api/admin/legal?slug=
///
/// Every version, drafts included, newest first within a slug.
pub async fn list_legal(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filter): Query<LegalFilter>,
) -> Result<Json<Vec<LegalDocument>>> {
    let slug = non_blank(filter.slug);
    Ok(Json(
        LegalDocumentRepository::new(state.pool())
            .list(slug.as_deref())
            .await?,
    ))
}

/// POST /api/admin/legal
///
/// Always creates a new unpublished version; published text is never edited.
#[instrument(skip_all, fields(admin_id = %admin.id, slug = %input.slug))]
pub async fn create_legal_version(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<LegalInput>,
) -> Result<(StatusCode, Json<LegalDocument>)> {
    let slug = identifier(&input.slug, "slug")?;
    let title = required(&input.title, "title")?;
    let body = required(&input.body, "body")?;

    let document = LegalDocumentRepository::new(state.pool())
        .create_version(&slug, &title, &body)
        .await?;
    info!(version = document.version, "Legal draft created");
    Ok((StatusCode::CREATED, Json(document)))
}

/// POST /api/admin/legal/{id}/publish
#[instrument(skip_all, fields(admin_id = %admin.id, id = %id))]
pub async fn publish_legal(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<LegalDocumentId>,
) -> Result<Json<LegalDocument>> {
    let document = LegalDocumentRepository::new(state.pool())
        .publish(id)
        .await?;
    info!(slug = %document.slug, version = document.version, "Legal document published");
    Ok(Json(document))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier(" order_confirmation ", "key").unwrap(), "order_confirmation");
        assert_eq!(identifier("privacy-policy", "slug").unwrap(), "privacy-policy");
        assert!(identifier("Order Confirmation", "key").is_err());
        assert!(identifier("", "key").is_err());
        assert!(identifier(&"a".repeat(65), "key").is_err());
    }

    #[test]
    fn test_template_needs_a_body() {
        let input = TemplateInput {
            key: "welcome".into(),
            subject: "Welcome, {{ name }}".into(),
            html_body: " ".into(),
            text_body: String::new(),
        };
        assert!(matches!(input.into_fields(), Err(AppError::BadRequest(_))));

        let input = TemplateInput {
            key: "welcome".into(),
            subject: "Welcome, {{ name }}".into(),
            html_body: String::new(),
            text_body: "Hi {{ name }}".into(),
        };
        assert_eq!(input.into_fields().unwrap().text_body, "Hi {{ name }}");
    }

    #[test]
    fn test_send_test_body_optional() {
        let input: SendTestInput = serde_json::from_str("{}").unwrap();
        assert!(input.to.is_none());
    }
}
