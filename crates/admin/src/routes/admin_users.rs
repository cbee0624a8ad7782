//! Admin account management, super admins only.
//!
//! The store always keeps at least one active super admin: demoting,
//! deactivating or deleting the last one is refused.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, instrument};

use greenleaf_core::AdminUserId;

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireSuperAdmin;
use crate::models::{AdminRole, AdminUser};
use crate::services::AdminAuthService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateAdminInput {
    pub email: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: AdminRole,
    pub password: SecretString,
}

const fn default_role() -> AdminRole {
    AdminRole::Viewer
}

/// Omitted fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateAdminInput {
    pub role: Option<AdminRole>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct SetPasswordInput {
    pub password: SecretString,
}

const fn is_active_super(role: AdminRole, active: bool) -> bool {
    matches!(role, AdminRole::SuperAdmin) && active
}

/// GET /api/admin/admin-users
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
) -> Result<Json<Vec<AdminUser>>> {
    Ok(Json(AdminUserRepository::new(state.pool()).list().await?))
}

/// POST /api/admin/admin-users
#[instrument(skip_all, fields(by = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(input): Json<CreateAdminInput>,
) -> Result<(StatusCode, Json<AdminUser>)> {
    let created = AdminAuthService::new(state.pool())
        .create_admin(
            &input.email,
            &input.name,
            input.role,
            input.password.expose_secret(),
        )
        .await?;
    info!(admin_id = %created.id, role = %created.role, "Admin account created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/admin/admin-users/{id}
#[instrument(skip_all, fields(by = %admin.id, admin_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<AdminUserId>,
    Json(input): Json<UpdateAdminInput>,
) -> Result<Json<AdminUser>> {
    let repo = AdminUserRepository::new(state.pool());
    let target = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("admin not found".into()))?;

    let role = input.role.unwrap_or(target.role);
    let active = input.active.unwrap_or(target.active);

    if is_active_super(target.role, target.active) && !is_active_super(role, active) {
        if repo.count_other_super_admins(id).await? == 0 {
            return Err(AppError::Conflict(
                "cannot demote or deactivate the last super admin".into(),
            ));
        }
    }

    let updated = repo.update_access(id, role, active).await?;
    info!(role = %updated.role, active = updated.active, "Admin access changed");
    Ok(Json(updated))
}

/// PUT /api/admin/admin-users/{id}/password
#[instrument(skip_all, fields(by = %admin.id, admin_id = %id))]
pub async fn set_password(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<AdminUserId>,
    Json(input): Json<SetPasswordInput>,
) -> Result<StatusCode> {
    AdminAuthService::new(state.pool())
        .set_password(id, input.password.expose_secret())
        .await?;
    info!("Admin password reset");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/admin-users/{id}
#[instrument(skip_all, fields(by = %admin.id, admin_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<AdminUserId>,
) -> Result<StatusCode> {
    let repo = AdminUserRepository::new(state.pool());
    let target = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("admin not found".into()))?;

    if is_active_super(target.role, target.active) {
        if repo.count_other_super_admins(id).await? == 0 {
            return Err(AppError::Conflict("cannot delete the last super admin".into()));
        }
    }

    repo.delete(id).await?;
    info!("Admin account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_active_super() {
        assert!(is_active_super(AdminRole::SuperAdmin, true));
        assert!(!is_active_super(AdminRole::SuperAdmin, false));
        assert!(!is_active_super(AdminRole::Admin, true));
    }

    #[test]
    fn test_create_defaults_to_viewer() {
        let input: CreateAdminInput = serde_json::from_str(
            r#"{"email":"a@greenleaf.shop","name":"Ana","password":"long enough"}"#,
        )
        .unwrap();
        assert_eq!(input.role, AdminRole::Viewer);
    }
}
