//! Member authentication errors.

use thiserror::Error;

use greenleaf_core::EmailError;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong password, or no account for the email. Callers must not be
    /// able to tell the two apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The signed-in member's row is gone.
    #[error("user not found")]
    UserNotFound,

    #[error("an account already exists for this email")]
    UserAlreadyExists,

    #[error("{0}")]
    WeakPassword(String),

    /// Unknown, expired, or already used.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
