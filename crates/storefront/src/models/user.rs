//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use greenleaf_core::{Email, UserId};

/// A storefront member.
///
/// Separate from Shopify customers; membership unlocks member prices.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
