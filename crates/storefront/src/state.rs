//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::{
    EmailService, PricingService, RealtimeHub, TranslationError, TranslationService,
};
use crate::shopify::StorefrontClient;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email configuration: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
    #[error("translation configuration: {0}")]
    Translation(#[from] TranslationError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    storefront: StorefrontClient,
    pricing: PricingService,
    email: EmailService,
    translation: Option<TranslationService>,
    realtime: RealtimeHub,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or translation client can't be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let storefront = StorefrontClient::new(&config.shopify);
        let email = EmailService::new(config.email.as_ref())?;
        let translation = config
            .translation
            .as_ref()
            .map(TranslationService::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storefront,
                pricing: PricingService::new(),
                email,
                translation,
                realtime: RealtimeHub::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Shopify Storefront API client.
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }

    /// Cart pricing with its rules cache.
    #[must_use]
    pub fn pricing(&self) -> &PricingService {
        &self.inner.pricing
    }

    /// Transactional email.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Translation client, `None` when not configured.
    #[must_use]
    pub fn translation(&self) -> Option<&TranslationService> {
        self.inner.translation.as_ref()
    }

    /// Realtime change feed.
    #[must_use]
    pub fn realtime(&self) -> &RealtimeHub {
        &self.inner.realtime
    }
}
