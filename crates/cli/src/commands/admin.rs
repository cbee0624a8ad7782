//! Admin user management commands.
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `GL_ADMIN_PASSWORD` - password for `admin create` when `-p` is omitted

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use greenleaf_admin::db;
use greenleaf_admin::models::AdminRole;
use greenleaf_admin::services::{AdminAuthError, AdminAuthService};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

/// Create a new admin user with a password.
///
/// # Errors
///
/// Returns an error for an unknown role, a weak password, a taken email, or
/// a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &SecretString,
) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let database_url = std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&database_url).await?;

    let admin = AdminAuthService::new(&pool)
        .create_admin(email, name, role, password.expose_secret())
        .await?;

    tracing::info!(
        "Admin user created! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(())
}
