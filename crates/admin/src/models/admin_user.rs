//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use greenleaf_core::{AdminUserId, Email};

pub use greenleaf_core::AdminRole;

/// A back-office account. The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    /// Deactivated accounts cannot sign in.
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
