//! HTTP route handlers for the back office.
//!
//! Reads need any signed-in admin, writes need `admin` or above, and account
//! management needs `super_admin`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                        - Liveness
//! GET  /health/ready                                  - Readiness (database)
//!
//! # Auth
//! POST /api/admin/auth/login
//! POST /api/admin/auth/logout
//! GET  /api/admin/auth/me
//! PUT  /api/admin/auth/password
//!
//! # Admin accounts (super_admin)
//! GET    /api/admin/admin-users
//! POST   /api/admin/admin-users
//! PATCH  /api/admin/admin-users/{id}                  - Role / active
//! PUT    /api/admin/admin-users/{id}/password
//! DELETE /api/admin/admin-users/{id}
//!
//! # Pricing
//! GET|POST       /api/admin/volume-discounts
//! PUT|DELETE     /api/admin/volume-discounts/{id}
//! GET|POST       /api/admin/bundles
//! PUT|DELETE     /api/admin/bundles/{id}
//! GET|PUT|DELETE /api/admin/member-prices               - Variant in body / query
//!
//! # Promotions
//! GET|POST       /api/admin/affiliates
//! GET|PUT|DELETE /api/admin/affiliates/{id}
//! GET            /api/admin/affiliates/{id}/commissions
//! POST           /api/admin/affiliates/{id}/commissions/mark-paid
//! GET|POST       /api/admin/influencers
//! GET|PUT|DELETE /api/admin/influencers/{id}
//! GET            /api/admin/influencers/{id}/redemptions
//!
//! # Content
//! GET|POST       /api/admin/email-templates
//! GET|PUT|DELETE /api/admin/email-templates/{id}
//! POST           /api/admin/email-templates/{id}/test
//! GET|POST       /api/admin/legal                       - List / new version
//! POST           /api/admin/legal/{id}/publish
//!
//! # Moderation
//! GET    /api/admin/reviews?status=pending
//! POST   /api/admin/reviews/{id}/approve
//! POST   /api/admin/reviews/{id}/reject
//! DELETE /api/admin/reviews/{id}
//!
//! # Reporting
//! GET /api/admin/orders
//! GET /api/admin/orders/{id}
//! GET /api/admin/donations
//! GET /api/admin/donations/totals
//! GET /api/admin/product-sales
//! GET /api/admin/dashboard
//! ```

pub mod admin_users;
pub mod affiliates;
pub mod auth;
pub mod content;
pub mod dashboard;
pub mod health;
pub mod influencers;
pub mod orders;
pub mod pricing;
pub mod reviews;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;

use crate::db::Page;
use crate::error::{AppError, Result};
use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// `?limit=&offset=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

/// Trim `value`, turning blank strings into `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Trim a required text field.
pub(crate) fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(value.to_owned())
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login).layer(login_rate_limiter()))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
}

pub fn admin_user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_users::index).post(admin_users::create))
        .route(
            "/{id}",
            patch(admin_users::update).delete(admin_users::destroy),
        )
        .route("/{id}/password", put(admin_users::set_password))
}

pub fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/volume-discounts",
            get(pricing::list_volume_discounts).post(pricing::create_volume_discount),
        )
        .route(
            "/volume-discounts/{id}",
            put(pricing::update_volume_discount).delete(pricing::delete_volume_discount),
        )
        .route(
            "/bundles",
            get(pricing::list_bundles).post(pricing::create_bundle),
        )
        .route(
            "/bundles/{id}",
            put(pricing::update_bundle).delete(pricing::delete_bundle),
        )
        .route(
            "/member-prices",
            get(pricing::list_member_prices)
                .put(pricing::upsert_member_price)
                .delete(pricing::delete_member_price),
        )
}

pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/affiliates",
            get(affiliates::index).post(affiliates::create),
        )
        .route(
            "/affiliates/{id}",
            get(affiliates::show)
                .put(affiliates::update)
                .delete(affiliates::destroy),
        )
        .route("/affiliates/{id}/commissions", get(affiliates::commissions))
        .route(
            "/affiliates/{id}/commissions/mark-paid",
            post(affiliates::mark_paid),
        )
        .route(
            "/influencers",
            get(influencers::index).post(influencers::create),
        )
        .route(
            "/influencers/{id}",
            get(influencers::show)
                .put(influencers::update)
                .delete(influencers::destroy),
        )
        .route("/influencers/{id}/redemptions", get(influencers::redemptions))
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/email-templates",
            get(content::list_templates).post(content::create_template),
        )
        .route(
            "/email-templates/{id}",
            get(content::show_template)
                .put(content::update_template)
                .delete(content::delete_template),
        )
        .route("/email-templates/{id}/test", post(content::send_test))
        .route(
            "/legal",
            get(content::list_legal).post(content::create_legal_version),
        )
        .route("/legal/{id}/publish", post(content::publish_legal))
        .route("/reviews", get(reviews::index))
        .route("/reviews/{id}/approve", post(reviews::approve))
        .route("/reviews/{id}/reject", post(reviews::reject))
        .route("/reviews/{id}", delete(reviews::destroy))
}

pub fn reporting_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/donations", get(orders::donations))
        .route("/donations/totals", get(orders::donation_totals))
        .route("/product-sales", get(orders::product_sales))
        .route("/dashboard", get(dashboard::summary))
}

/// Create all routes for the back office.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/admin-users", admin_user_routes())
        .merge(pricing_routes())
        .merge(promotion_routes())
        .merge(content_routes())
        .merge(reporting_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/admin", api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  SAVE10 ".into())), Some("SAVE10".into()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Spring  ", "name").unwrap_or_default(), "Spring");
        assert!(required(" ", "name").is_err());
    }
}
