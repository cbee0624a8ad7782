//! Database operations for storefront `PostgreSQL`.
//!
//! Shopify is the source of truth for products and carts. The database holds
//! members, discount rules, ingested orders and everything derived from them
//! (sales counters, commissions, donations), plus reviews, wishlists, email
//! templates and legal documents. All tables live in the `storefront` schema.
//!
//! Repositories borrow the pool. Writes that must happen atomically with a
//! webhook delivery are free functions taking a `PgConnection`, so callers
//! can run them inside one transaction.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p greenleaf-cli -- migrate storefront
//! ```

pub mod affiliates;
pub mod donations;
pub mod email_templates;
pub mod influencers;
pub mod legal;
pub mod orders;
pub mod pricing;
pub mod reviews;
pub mod sales;
pub mod users;
pub mod webhooks;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use affiliates::AffiliateRepository;
pub use donations::DonationRepository;
pub use email_templates::EmailTemplateRepository;
pub use influencers::InfluencerRepository;
pub use legal::LegalDocumentRepository;
pub use orders::OrderRepository;
pub use pricing::PricingRepository;
pub use reviews::ReviewRepository;
pub use sales::SalesRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
