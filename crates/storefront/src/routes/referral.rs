//! Affiliate referral links.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::keys;
use crate::services::{PromoError, PromotionService};
use crate::state::AppState;

/// Referral link query parameters.
#[derive(Debug, Deserialize)]
pub struct ReferralQuery {
    /// Storefront path to land on, e.g. `/products/fern`.
    pub to: Option<String>,
}

/// Record a referral click and remember the code for checkout.
///
/// Unknown or inactive codes still redirect so links in old posts keep
/// working.
///
/// GET /r/{affiliate_code}
#[instrument(skip(state, session, query))]
pub async fn follow(
    State(state): State<AppState>,
    session: Session,
    Path(affiliate_code): Path<String>,
    Query(query): Query<ReferralQuery>,
) -> Result<Redirect> {
    match PromotionService::new(state.pool())
        .record_referral(&affiliate_code)
        .await
    {
        Ok(affiliate) => session.insert(keys::AFFILIATE_CODE, &affiliate.code).await?,
        Err(PromoError::NotFound | PromoError::InvalidCode(_)) => {
            info!("Referral link with unknown code");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&landing_url(
        &state.config().base_url,
        query.to.as_deref(),
    )))
}

/// Absolute URL on the storefront. Anything but a plain local path lands on
/// the home page.
fn landing_url(base_url: &str, to: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match to {
        Some(path) if is_local_path(path) => format!("{base}{path}"),
        _ => format!("{base}/"),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_url() {
        let base = "https://greenleaf.shop/";
        assert_eq!(landing_url(base, None), "https://greenleaf.shop/");
        assert_eq!(
            landing_url(base, Some("/products/fern")),
            "https://greenleaf.shop/products/fern"
        );
    }

    #[test]
    fn test_landing_url_rejects_offsite_targets() {
        let base = "https://greenleaf.shop";
        assert_eq!(landing_url(base, Some("https://evil.example")), "https://greenleaf.shop/");
        assert_eq!(landing_url(base, Some("//evil.example")), "https://greenleaf.shop/");
        assert_eq!(landing_url(base, Some("/\\evil.example")), "https://greenleaf.shop/");
        assert_eq!(landing_url(base, Some("/a\nb")), "https://greenleaf.shop/");
    }
}
