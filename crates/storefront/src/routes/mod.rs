//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//!
//! # Catalog
//! POST /api/storefront/graphql          - Read-only Storefront API proxy
//! GET  /api/products                    - Product listing
//! GET  /api/products/bestsellers        - Bestsellers from sales counters
//! GET  /api/products/{handle}           - Product detail (+ member prices)
//! GET  /api/products/{handle}/reviews   - Approved reviews + rating summary
//! POST /api/products/{handle}/reviews   - Submit review (auth)
//! GET  /api/collections/{handle}        - Collection with a page of products
//! GET  /api/member-prices               - Member prices by variant (auth)
//!
//! # Cart
//! GET    /api/cart                      - Cart with totals
//! POST   /api/cart/lines                - Add line
//! PATCH  /api/cart/lines                - Change quantity
//! DELETE /api/cart/lines/{line_id}      - Remove line
//! PUT    /api/cart/round-up             - Toggle round-up donation
//! PUT    /api/cart/donation             - Set or clear a fixed donation
//! POST   /api/cart/codes                - Apply influencer/affiliate code
//! DELETE /api/cart/codes                - Clear codes
//! POST   /api/checkout                  - Hand off to Shopify checkout
//! GET    /r/{affiliate_code}            - Referral link
//!
//! # Community
//! GET  /api/donations/summary           - Donation totals
//! GET  /api/donations/recent            - Recent donations
//! GET  /api/realtime                    - SSE change feed
//! GET  /api/legal/{slug}                - Published legal document
//! POST /api/translate                   - Translation on demand
//! POST /api/contact                     - Contact form
//!
//! # Auth
//! POST /api/auth/register
//! POST /api/auth/login
//! POST /api/auth/logout
//! POST /api/auth/password-reset/request
//! POST /api/auth/password-reset/confirm
//!
//! # Account
//! GET    /api/account                   - Profile (auth)
//! GET    /api/account/orders            - Order history (auth)
//! GET    /api/account/wishlist          - Wishlist (guest or member)
//! POST   /api/account/wishlist
//! DELETE /api/account/wishlist/{handle}
//!
//! # Webhooks
//! POST /webhooks/shopify                - Shopify order webhooks
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod collections;
pub mod contact;
pub mod donations;
pub mod health;
pub mod legal;
pub mod products;
pub mod proxy;
pub mod realtime;
pub mod referral;
pub mod reviews;
pub mod translate;
pub mod webhooks;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter, code_rate_limiter};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/bestsellers", get(products::bestsellers))
        .route("/{handle}", get(products::show))
        .route(
            "/{handle}/reviews",
            get(reviews::index).post(reviews::create),
        )
}

/// Create the collection routes router.
pub fn collection_routes() -> Router<AppState> {
    Router::new().route("/{handle}", get(collections::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/lines", post(cart::add).patch(cart::update))
        .route("/lines/{line_id}", delete(cart::remove))
        .route("/round-up", put(cart::set_round_up))
        .route("/donation", put(cart::set_donation))
        .route(
            "/codes",
            post(cart::apply_code)
                .delete(cart::clear_codes)
                .layer(code_rate_limiter()),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/password-reset/request", post(auth::request_password_reset))
        .route("/password-reset/confirm", post(auth::confirm_password_reset))
        .layer(auth_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
        .route(
            "/wishlist",
            get(account::wishlist).post(account::add_to_wishlist),
        )
        .route("/wishlist/{handle}", delete(account::remove_from_wishlist))
}

/// Everything under `/api` except auth.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/storefront/graphql", post(proxy::graphql))
        .nest("/products", product_routes())
        .nest("/collections", collection_routes())
        .route("/member-prices", get(products::member_prices))
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .route("/donations/summary", get(donations::summary))
        .route("/donations/recent", get(donations::recent))
        .route("/legal/{slug}", get(legal::show))
        .route("/translate", post(translate::translate))
        .route("/contact", post(contact::submit))
        .nest("/account", account_routes())
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
///
/// The realtime feed and webhook receiver are not rate limited: SSE
/// connections are long-lived and Shopify retries on 429.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
        .nest("/api/auth", auth_routes())
        .route(
            "/r/{affiliate_code}",
            get(referral::follow).layer(code_rate_limiter()),
        )
        .route("/api/realtime", get(realtime::stream))
        .route("/webhooks/shopify", post(webhooks::shopify))
}

