//! Back-office sign-in and account management.
//!
//! Passwords are hashed with Argon2id. Unknown emails, wrong passwords and
//! deactivated accounts all fail the same way.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use greenleaf_core::{AdminUserId, Email};

use crate::db::RepositoryError;
use crate::db::admin_users::{AdminUserRepository, NewAdminUser};
use crate::models::{AdminRole, AdminUser};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length; bounds hashing cost.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Errors from admin authentication.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] greenleaf_core::EmailError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an admin with this email already exists")]
    AlreadyExists,

    #[error("{0}")]
    WeakPassword(String),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("admin not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

pub struct AdminAuthService<'a> {
    admins: AdminUserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            admins: AdminUserRepository::new(pool),
        }
    }

    /// Check credentials and stamp `last_login_at`.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` for unknown emails, wrong
    /// passwords and deactivated accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, AdminAuthError> {
        let email = Email::parse(email).map_err(|_| AdminAuthError::InvalidCredentials)?;

        let Some((admin, password_hash)) = self.admins.get_login(&email).await? else {
            return Err(AdminAuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;
        if !admin.active {
            return Err(AdminAuthError::InvalidCredentials);
        }

        self.admins.record_login(admin.id).await?;
        Ok(admin)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::AlreadyExists` if the email is taken, or a
    /// validation error for a bad email, empty name or weak password.
    pub async fn create_admin(
        &self,
        email: &str,
        name: &str,
        role: AdminRole,
        password: &str,
    ) -> Result<AdminUser, AdminAuthError> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AdminAuthError::EmptyName);
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.admins
            .create(&NewAdminUser {
                email: &email,
                name,
                role,
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AdminAuthError::AlreadyExists,
                other => AdminAuthError::Repository(other),
            })
    }

    /// Change one's own password after re-checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` if `current` is wrong.
    pub async fn change_password(
        &self,
        id: AdminUserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), AdminAuthError> {
        let admin = self
            .admins
            .get_by_id(id)
            .await?
            .ok_or(AdminAuthError::NotFound)?;
        let (_, password_hash) = self
            .admins
            .get_login(&admin.email)
            .await?
            .ok_or(AdminAuthError::NotFound)?;

        verify_password(current, &password_hash)?;
        self.set_password(id, new_password).await
    }

    /// Replace a password without knowing the old one.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::WeakPassword` or `AdminAuthError::NotFound`.
    pub async fn set_password(&self, id: AdminUserId, new_password: &str) -> Result<(), AdminAuthError> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;
        self.admins
            .set_password_hash(id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AdminAuthError::NotFound,
                other => AdminAuthError::Repository(other),
            })
    }
}

/// Check password length bounds.
///
/// # Errors
///
/// Returns `AdminAuthError::WeakPassword` describing the violated bound.
pub fn validate_password(password: &str) -> Result<(), AdminAuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id into a PHC string.
///
/// # Errors
///
/// Returns `AdminAuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AdminAuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}
