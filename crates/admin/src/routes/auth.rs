//! Back-office sign-in.
//!
//! A successful login cycles the session id and stores a [`CurrentAdmin`].
//! Logout drops the whole session.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdmin, clear_current_admin, set_current_admin};
use crate::models::{AdminUser, CurrentAdmin};
use crate::services::AdminAuthService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: SecretString,
}

#[derive(Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: SecretString,
    pub new_password: SecretString,
}

/// POST /api/admin/auth/login
#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> Result<Json<AdminUser>> {
    let admin = AdminAuthService::new(state.pool())
        .login(&input.email, input.password.expose_secret())
        .await?;

    set_current_admin(&session, &CurrentAdmin::from(&admin)).await?;
    set_sentry_user(&admin.id, admin.email.as_str());
    info!(admin_id = %admin.id, role = %admin.role, "Admin signed in");
    Ok(Json(admin))
}

/// POST /api/admin/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/auth/me
pub async fn me(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<AdminUser>> {
    AdminUserRepository::new(state.pool())
        .get_by_id(admin.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Sign in required".into()))
}

/// PUT /api/admin/auth/password
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ChangePasswordInput>,
) -> Result<StatusCode> {
    AdminAuthService::new(state.pool())
        .change_password(
            admin.id,
            input.current_password.expose_secret(),
            input.new_password.expose_secret(),
        )
        .await?;
    info!("Admin changed password");
    Ok(StatusCode::NO_CONTENT)
}
