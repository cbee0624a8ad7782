//! Authentication and role extractors.
//!
//! The session only remembers who signed in. Every guarded request reloads
//! the account, so deactivation and role changes apply immediately.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;
use tracing::{Span, error};

use crate::db::AdminUserRepository;
use crate::models::{AdminRole, CurrentAdmin, keys};
use crate::state::AppState;

/// What a route needs from the signed-in admin's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ManageAdmins,
}

/// Check `role` against `access`.
///
/// # Errors
///
/// Returns `AdminRejection::Forbidden` when the role falls short.
pub const fn authorize(role: AdminRole, access: Access) -> Result<(), AdminRejection> {
    match access {
        Access::Read => Ok(()),
        Access::Write if role.can_write() => Ok(()),
        Access::Write => Err(AdminRejection::Forbidden("Read-only access")),
        Access::ManageAdmins if role.can_manage_admins() => Ok(()),
        Access::ManageAdmins => Err(AdminRejection::Forbidden(
            "Only super admins can manage admin accounts",
        )),
    }
}

/// Why a guarded request was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum AdminRejection {
    Unauthorized,
    Forbidden(&'static str),
    Unavailable,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Self::Unavailable => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn load_admin(
    parts: &Parts,
    state: &AppState,
    access: Access,
) -> Result<CurrentAdmin, AdminRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AdminRejection::Unauthorized)?;

    let signed_in: CurrentAdmin = session
        .get(keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
        .ok_or(AdminRejection::Unauthorized)?;

    let account = AdminUserRepository::new(state.pool())
        .get_by_id(signed_in.id)
        .await
        .map_err(|e| {
            error!(error = %e, admin_id = %signed_in.id, "Failed to reload admin");
            AdminRejection::Unavailable
        })?;

    let Some(account) = account.filter(|a| a.active) else {
        let _ = clear_current_admin(session).await;
        return Err(AdminRejection::Unauthorized);
    };

    Span::current().record("admin_id", account.id.as_i32());
    authorize(account.role, access)?;
    Ok(CurrentAdmin::from(&account))
}

/// Any active admin, viewers included.
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// An admin allowed to change store data.
pub struct RequireWriter(pub CurrentAdmin);

/// A super admin.
pub struct RequireSuperAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        load_admin(parts, &AppState::from_ref(state), Access::Read)
            .await
            .map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireWriter
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        load_admin(parts, &AppState::from_ref(state), Access::Write)
            .await
            .map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        load_admin(parts, &AppState::from_ref(state), Access::ManageAdmins)
            .await
            .map(Self)
    }
}

/// Store the signed-in admin, cycling the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_ADMIN, admin).await
}

/// Sign out by dropping the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_reads_only() {
        assert!(authorize(AdminRole::Viewer, Access::Read).is_ok());
        assert_eq!(
            authorize(AdminRole::Viewer, Access::Write),
            Err(AdminRejection::Forbidden("Read-only access"))
        );
    }

    #[test]
    fn test_only_super_admin_manages_admins() {
        assert!(authorize(AdminRole::Admin, Access::Write).is_ok());
        assert!(authorize(AdminRole::Admin, Access::ManageAdmins).is_err());
        assert!(authorize(AdminRole::SuperAdmin, Access::ManageAdmins).is_ok());
    }

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(
            AdminRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AdminRejection::Forbidden("no").into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
