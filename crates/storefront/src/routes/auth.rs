//! Authentication route handlers.
//!
//! Members sign in with email and password. A successful login cycles the
//! session id, stores a [`CurrentUser`] and folds any guest wishlist into
//! the account.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::services::email::PasswordReset;
use crate::state::AppState;

use super::account::merge_guest_wishlist;

// =============================================================================
// Request Types
// =============================================================================

/// Registration body.
#[derive(Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: SecretString,
    pub display_name: Option<String>,
}

/// Login body.
#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: SecretString,
}

/// Password reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetRequestInput {
    pub email: String,
}

/// Password reset confirmation body.
#[derive(Deserialize)]
pub struct ResetConfirmInput {
    pub token: SecretString,
    pub password: SecretString,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and sign in.
///
/// POST /api/auth/register
#[instrument(skip(state, session, input))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register_with_password(
            &input.email,
            input.password.expose_secret(),
            input.display_name.as_deref(),
        )
        .await?;

    sign_in(&state, &session, &user).await?;
    info!(user_id = %user.id, "Member registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in with email and password.
///
/// POST /api/auth/login
#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&input.email, input.password.expose_secret())
        .await?;

    sign_in(&state, &session, &user).await?;
    info!(user_id = %user.id, "Member logged in");
    Ok(Json(user))
}

/// Sign out. The cart stays with the session.
///
/// POST /api/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// Email a password reset link.
///
/// Responds the same whether or not the address has an account.
///
/// POST /api/auth/password-reset/request
#[instrument(skip(state, input))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetRequestInput>,
) -> Result<StatusCode> {
    let issued = AuthService::new(state.pool())
        .request_password_reset(&input.email)
        .await?;

    if let Some((user, token)) = issued {
        let email = PasswordReset {
            reset_url: reset_url(&state.config().base_url, &token),
        };
        if let Err(e) = state
            .email()
            .send(state.pool(), user.email.as_str(), &email)
            .await
        {
            warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
    }

    Ok(StatusCode::ACCEPTED)
}

/// Set a new password from a reset link and sign in.
///
/// POST /api/auth/password-reset/confirm
#[instrument(skip(state, session, input))]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<ResetConfirmInput>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .reset_password(input.token.expose_secret(), input.password.expose_secret())
        .await?;

    sign_in(&state, &session, &user).await?;
    info!(user_id = %user.id, "Password reset");
    Ok(Json(user))
}

async fn sign_in(state: &AppState, session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    merge_guest_wishlist(state, session, user.id).await
}

fn reset_url(base_url: &str, token: &str) -> String {
    format!(
        "{}/account/reset-password?token={token}",
        base_url.trim_end_matches('/')
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_url() {
        assert_eq!(
            reset_url("https://greenleaf.shop/", "abc_-123"),
            "https://greenleaf.shop/account/reset-password?token=abc_-123"
        );
    }

    #[test]
    fn test_login_input_deserializes_secret() {
        let input: LoginInput =
            serde_json::from_str(r#"{"email":"sam@example.com","password":"hunter2hunter2"}"#)
                .unwrap();
        assert_eq!(input.email, "sam@example.com");
        assert_eq!(input.password.expose_secret(), "hunter2hunter2");
    }
}
