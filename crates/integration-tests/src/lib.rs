//! Integration tests for Greenleaf.
//!
//! The tests drive running servers over HTTP and are `#[ignore]`d by default.
//!
//! ```bash
//! gl-cli migrate all
//! gl-cli admin create -e it@greenleaf.shop -n "IT" -r super_admin -p 'integration-pass'
//! cargo run -p greenleaf-storefront &
//! cargo run -p greenleaf-admin &
//! cargo test -p greenleaf-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` (default `http://localhost:3000`)
//! - `ADMIN_BASE_URL` (default `http://localhost:3001`)
//! - `IT_ADMIN_EMAIL`, `IT_ADMIN_PASSWORD` - a `super_admin` account
//! - `SHOPIFY_WEBHOOK_SECRET` - the storefront's webhook secret

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde_json::json;
use sha2::Sha256;

#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps session cookies between requests.
///
/// # Panics
///
/// Panics if the TLS backend can't be initialized.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A client signed in to the back office as the configured super admin.
///
/// # Panics
///
/// Panics if the credentials are missing or rejected.
pub async fn admin_client() -> Client {
    let email = std::env::var("IT_ADMIN_EMAIL").expect("IT_ADMIN_EMAIL not set");
    let password = std::env::var("IT_ADMIN_PASSWORD").expect("IT_ADMIN_PASSWORD not set");

    let client = client();
    let resp = client
        .post(format!("{}/api/admin/auth/login", admin_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to reach admin server");
    assert_eq!(resp.status(), StatusCode::OK, "admin login failed");
    client
}

/// Short random suffix for codes and emails so runs don't collide.
#[must_use]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase()
}

/// Base64 HMAC-SHA256 of `body`, as Shopify sends in `X-Shopify-Hmac-Sha256`.
///
/// # Panics
///
/// Panics if the key is rejected, which HMAC never does.
#[must_use]
pub fn shopify_signature(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_signature_is_stable() {
        let a = shopify_signature("secret", b"{}");
        let b = shopify_signature("secret", b"{}");
        assert_eq!(a, b);
        assert_ne!(a, shopify_signature("other", b"{}"));
        assert_eq!(unique_suffix().len(), 8);
    }
}
