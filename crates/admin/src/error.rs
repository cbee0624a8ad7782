//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server errors are captured to
//! Sentry; clients always get `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use greenleaf_core::pricing::PricingError;
use greenleaf_core::promo::CodeError;

use crate::db::RepositoryError;
use crate::services::{AdminAuthError, EmailError};

/// Application-level error type for the back office.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Discount rule rejected by the pricing engine's checks.
    #[error("Invalid pricing rule: {0}")]
    Pricing(#[from] PricingError),

    #[error("Invalid code: {0}")]
    Code(#[from] CodeError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but the role doesn't allow it.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The change would break an invariant on existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AdminAuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AdminAuthError::AlreadyExists => StatusCode::CONFLICT,
                AdminAuthError::NotFound => StatusCode::NOT_FOUND,
                AdminAuthError::InvalidEmail(_)
                | AdminAuthError::WeakPassword(_)
                | AdminAuthError::EmptyName => StatusCode::BAD_REQUEST,
                AdminAuthError::Repository(_) | AdminAuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Email(err) => match err {
                EmailError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                EmailError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Pricing(_) | Self::Code(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        let status = self.status();
        if status == StatusCode::BAD_GATEWAY {
            return "Mail relay error".to_string();
        }
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            return "Internal server error".to_string();
        }

        match self {
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) => "Not found".to_string(),
            Self::Auth(AdminAuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Email(err) => err.to_string(),
            Self::Pricing(err) => err.to_string(),
            Self::Code(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the signed-in admin.
pub fn set_sentry_user(admin_id: &impl ToString, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            get_status(AppError::Forbidden("viewer".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("code taken".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AdminAuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AdminAuthError::WeakPassword("short".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(PricingError::BundleTooSmall.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(EmailError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = AppError::Internal("pool exhausted".into());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Database(RepositoryError::DataCorruption("bad email".into()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Database(RepositoryError::Conflict("code taken".into()));
        assert_eq!(err.public_message(), "code taken");

        let err = AppError::Email(EmailError::NotConfigured);
        assert_eq!(err.public_message(), "SMTP is not configured");
    }
}
