//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token
//! - `SHOPIFY_WEBHOOK_SECRET` - Shared secret used to sign webhook deliveries
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SHOPIFY_DONATION_VARIANT_ID` - Variant GID of the one-cent donation
//!   product; donations are disabled when unset
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   outgoing mail; email is logged and skipped when `SMTP_HOST` is unset
//! - `CONTACT_EMAIL` - Inbox for contact form messages (default: `EMAIL_FROM`)
//! - `TRANSLATION_API_URL`, `TRANSLATION_API_KEY`, `TRANSLATION_MODEL` -
//!   OpenAI-compatible chat completions endpoint for on-demand translation
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: production)

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use greenleaf_core::secret::{WeakSecret, check_session_secret, check_strength};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, WeakSecret),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Shopify Storefront API and webhook configuration
    pub shopify: ShopifyConfig,
    /// Outgoing mail, `None` when SMTP is not configured
    pub email: Option<EmailConfig>,
    /// LLM translation gateway, `None` when not configured
    pub translation: Option<TranslationConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: String,
}

/// Shopify configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API private access token (server-side only)
    pub storefront_private_token: SecretString,
    /// HMAC key for `X-Shopify-Hmac-Sha256`
    pub webhook_secret: SecretString,
    /// One-cent donation variant; the cart line quantity is the donation in cents
    pub donation_variant_id: Option<String>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_private_token", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("donation_variant_id", &self.donation_variant_id)
            .finish()
    }
}

/// SMTP configuration.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    /// `From:` mailbox, e.g. `Greenleaf <hello@greenleaf.shop>`
    pub from_address: String,
    /// Where contact form messages are delivered
    pub contact_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("contact_address", &self.contact_address)
            .finish()
    }
}

/// OpenAI-compatible translation gateway configuration.
#[derive(Clone)]
pub struct TranslationConfig {
    /// Chat completions URL
    pub api_url: String,
    pub api_key: SecretString,
    pub model: String,
}

impl std::fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; real deployments set the environment.
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: database_url("STOREFRONT_DATABASE_URL")?,
            host: parsed("STOREFRONT_HOST", "127.0.0.1")?,
            port: parsed("STOREFRONT_PORT", "3000")?,
            base_url: required("STOREFRONT_BASE_URL")?,
            session_secret: session_secret("STOREFRONT_SESSION_SECRET")?,
            shopify: ShopifyConfig::from_env()?,
            email: EmailConfig::from_env()?,
            translation: TranslationConfig::from_env()?,
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: or_default("SENTRY_ENVIRONMENT", "production"),
        })
    }

    /// Returns the socket address for binding the server.
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

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: required("SHOPIFY_STORE")?,
            api_version: or_default("SHOPIFY_API_VERSION", "2026-01"),
            storefront_private_token: secret("SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?,
            webhook_secret: secret("SHOPIFY_WEBHOOK_SECRET")?,
            donation_variant_id: optional("SHOPIFY_DONATION_VARIANT_ID"),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = optional("SMTP_HOST") else {
            return Ok(None);
        };
        let from_address = required("EMAIL_FROM")?;
        let contact_address = optional("CONTACT_EMAIL").unwrap_or_else(|| from_address.clone());

        Ok(Some(Self {
            smtp_host,
            smtp_port: parsed("SMTP_PORT", "587")?,
            smtp_username: optional("SMTP_USERNAME"),
            smtp_password: optional("SMTP_PASSWORD").map(SecretString::from),
            from_address,
            contact_address,
        }))
    }
}

impl TranslationConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_url) = optional("TRANSLATION_API_URL") else {
            return Ok(None);
        };
        Ok(Some(Self {
            api_url,
            api_key: secret("TRANSLATION_API_KEY")?,
            model: or_default("TRANSLATION_MODEL", "gpt-4o-mini"),
        }))
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

/// Blank values count as unset.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
}

fn or_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_owned())
}

fn parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    or_default(key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
}

/// Fly.io's postgres attach sets the generic `DATABASE_URL`.
fn database_url(key: &str) -> Result<SecretString, ConfigError> {
    optional(key)
        .or_else(|| optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
}

fn secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required(key)?;
    check_strength(&value).map_err(|e| ConfigError::InsecureSecret(key.to_owned(), e))?;
    Ok(SecretString::from(value))
}

fn session_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required(key)?;
    check_session_secret(&value).map_err(|e| ConfigError::InsecureSecret(key.to_owned(), e))?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shopify() -> ShopifyConfig {
        ShopifyConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("super_secret_private_token"),
            webhook_secret: SecretString::from("super_secret_webhook_key"),
            donation_variant_id: None,
        }
    }

    #[test]
    fn test_parsed_falls_back_to_default() {
        let port: u16 = parsed("GL_TEST_UNSET_STOREFRONT_PORT", "3000").unwrap();
        assert_eq!(port, 3000);

        let err = parsed::<IpAddr>("GL_TEST_UNSET_STOREFRONT_HOST", "not-an-ip").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "GL_TEST_UNSET_STOREFRONT_HOST"));
    }

    #[test]
    fn test_insecure_secret_message_names_variable() {
        let err = ConfigError::InsecureSecret(
            "SHOPIFY_WEBHOOK_SECRET".into(),
            check_strength("your-webhook-key").unwrap_err(),
        );
        assert_eq!(
            err.to_string(),
            "Insecure secret in SHOPIFY_WEBHOOK_SECRET: appears to be a placeholder (contains 'your-')"
        );
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://greenleaf.shop".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            shopify: shopify(),
            email: None,
            translation: None,
            sentry_dsn: None,
            sentry_environment: "test".to_string(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_https());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", shopify());
        assert!(debug_output.contains("test.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_token"));
        assert!(!debug_output.contains("super_secret_webhook_key"));

        let email = EmailConfig {
            smtp_host: "smtp.local".to_string(),
            smtp_port: 587,
            smtp_username: Some("mailer".to_string()),
            smtp_password: Some(SecretString::from("hunter2-smtp")),
            from_address: "shop@greenleaf.shop".to_string(),
            contact_address: "help@greenleaf.shop".to_string(),
        };
        assert!(!format!("{email:?}").contains("hunter2-smtp"));
    }
}
