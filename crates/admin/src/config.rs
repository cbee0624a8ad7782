//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`).
//!   Must reach the same database as the storefront: admin edits `storefront.*` tables.
//! - `ADMIN_BASE_URL` - Public URL for the back office
//! - `ADMIN_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   outgoing mail for template test sends
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: production)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use greenleaf_core::secret::{WeakSecret, check_session_secret};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, WeakSecret),
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Same database as the storefront (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL for the back office
    pub base_url: String,
    pub session_secret: SecretString,
    /// `None` disables template test sends
    pub email: Option<EmailConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: String,
}

/// SMTP settings for template test sends. `Debug` hides the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from the environment (and `.env` when present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or malformed variable, or a weak
    /// session secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let session_secret = required("ADMIN_SESSION_SECRET")?;
        check_session_secret(&session_secret)
            .map_err(|e| ConfigError::InsecureSecret("ADMIN_SESSION_SECRET".into(), e))?;

        Ok(Self {
            database_url: optional("ADMIN_DATABASE_URL")
                .or_else(|| optional("DATABASE_URL"))
                .map(SecretString::from)
                .ok_or_else(|| ConfigError::MissingEnvVar("ADMIN_DATABASE_URL".into()))?,
            host: parse_or("ADMIN_HOST", "127.0.0.1")?,
            port: parse_or("ADMIN_PORT", "3001")?,
            base_url: required("ADMIN_BASE_URL")?,
            session_secret: SecretString::from(session_secret),
            email: EmailConfig::from_env()?,
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT")
                .unwrap_or_else(|| "production".to_owned()),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = optional("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_or("SMTP_PORT", "587")?,
            smtp_username: optional("SMTP_USERNAME"),
            smtp_password: optional("SMTP_PASSWORD").map(SecretString::from),
            from_address: required("EMAIL_FROM")?,
        }))
    }
}

/// Blank values count as unset.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
}

fn parse_or<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional(key)
        .as_deref()
        .unwrap_or(default)
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default_and_error() {
        let port: u16 = parse_or("GL_TEST_UNSET_ADMIN_PORT", "3001").unwrap();
        assert_eq!(port, 3001);
        assert!(matches!(
            parse_or::<u16>("GL_TEST_UNSET_ADMIN_PORT", "99999"),
            Err(ConfigError::InvalidEnvVar(..))
        ));
    }

    #[test]
    fn test_required_missing() {
        let err = required("GL_TEST_UNSET_ADMIN_BASE_URL").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: GL_TEST_UNSET_ADMIN_BASE_URL"
        );
    }

    #[test]
    fn test_config_socket_addr() {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/greenleaf"),
            host: "0.0.0.0".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            session_secret: SecretString::from("k".repeat(40)),
            email: None,
            sentry_dsn: None,
            sentry_environment: "test".to_string(),
        };
        assert_eq!(config.socket_addr().port(), 3001);
        assert!(!config.is_https());
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let email = EmailConfig {
            smtp_host: "smtp.local".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: Some(SecretString::from("smtp-hunter2")),
            from_address: "ops@greenleaf.shop".to_string(),
        };
        let debug = format!("{email:?}");
        assert!(!debug.contains("smtp-hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
