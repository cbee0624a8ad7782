//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - `graphql_client` request/response envelopes, hand-written documents
//! - Shopify is source of truth for products and carts - no local sync
//! - In-memory caching via `moka` for products and collections (5 minute TTL)
//! - Server-side private token; browsers reach the API only through the
//!   read-only [`proxy`]
//!
//! # Example
//!
//! ```rust,ignore
//! use greenleaf_storefront::shopify::{CartLineInput, StorefrontClient};
//!
//! let client = StorefrontClient::new(&config.shopify);
//!
//! let product = client.get_product_by_handle("fern").await?;
//! let cart = client
//!     .create_cart(
//!         vec![CartLineInput {
//!             merchandise_id: product.variants[0].id.clone(),
//!             quantity: 1,
//!             attributes: vec![],
//!         }],
//!         vec![],
//!     )
//!     .await?;
//! ```

mod cache;
mod client;
pub mod proxy;
pub mod queries;
pub mod types;

pub use client::{MAX_PAGE_SIZE, ProductQuery, StorefrontClient};
pub use proxy::{ProxyRejection, ProxyRequest};
pub use types::*;

use std::fmt;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL errors: {}", join_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Throttled; seconds until the bucket refills.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A cart mutation's `userErrors`.
    #[error("User error: {0}")]
    UserError(String),
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphQLError {
    pub message: String,
    /// Dotted response path, e.g. `cart.lines.0`; empty when absent.
    pub path: String,
}

impl GraphQLError {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: String::new(),
        }
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.message.is_empty(), self.path.is_empty()) {
            (false, true) => f.write_str(&self.message),
            (false, false) => write!(f, "{} (at {})", self.message, self.path),
            (true, false) => write!(f, "(at {})", self.path),
            (true, true) => f.write_str("(no details)"),
        }
    }
}

fn join_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(none reported)".to_owned();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_errors_joined() {
        let err = ShopifyError::GraphQL(vec![
            GraphQLError {
                message: "Invalid ID".into(),
                path: "cartLinesAdd.lines.0".into(),
            },
            GraphQLError::message("Throttled"),
            GraphQLError::default(),
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Invalid ID (at cartLinesAdd.lines.0); Throttled; (no details)"
        );
        assert_eq!(
            ShopifyError::GraphQL(vec![]).to_string(),
            "GraphQL errors: (none reported)"
        );
    }

    #[test]
    fn test_rate_limited_display() {
        assert_eq!(
            ShopifyError::RateLimited(2).to_string(),
            "Rate limited, retry after 2 seconds"
        );
    }
}
