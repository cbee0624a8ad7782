//! Influencer and affiliate codes.
//!
//! A shopper can type either kind of code on the cart. Influencer codes are
//! checked against their redemption terms; affiliate codes only need to be
//! active. Counting uses happens later, when the paid order arrives.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument};

use greenleaf_core::models::{Affiliate, Influencer};
use greenleaf_core::promo::{CodeError, CodeRejection, normalize_code};

use crate::db::{AffiliateRepository, InfluencerRepository, RepositoryError};

/// Errors from code validation.
#[derive(Debug, Error)]
pub enum PromoError {
    /// Code is malformed.
    #[error(transparent)]
    InvalidCode(#[from] CodeError),

    /// No active code matches.
    #[error("code not found")]
    NotFound,

    /// The influencer code exists but can't be used now.
    #[error(transparent)]
    Rejected(#[from] CodeRejection),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A code accepted on the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedCode {
    Influencer {
        code: String,
        discount_percent: Decimal,
        free_product_variant_id: Option<String>,
        /// Redemptions left, `None` when unlimited.
        remaining_uses: Option<i32>,
    },
    Affiliate {
        code: String,
        /// Shopify discount code passed to checkout, if the affiliate has one.
        customer_discount_code: Option<String>,
    },
}

impl AppliedCode {
    /// The normalized code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Influencer { code, .. } | Self::Affiliate { code, .. } => code,
        }
    }

    /// Shopify discount code to apply at checkout.
    #[must_use]
    pub fn shopify_discount_code(&self) -> Option<&str> {
        match self {
            Self::Influencer { code, .. } => Some(code),
            Self::Affiliate {
                customer_discount_code,
                ..
            } => customer_discount_code.as_deref(),
        }
    }
}

impl From<&Influencer> for AppliedCode {
    fn from(influencer: &Influencer) -> Self {
        Self::Influencer {
            code: influencer.code.clone(),
            discount_percent: influencer.discount_percent,
            free_product_variant_id: influencer.free_product_variant_id.clone(),
            remaining_uses: influencer.terms().remaining_uses(),
        }
    }
}

impl From<&Affiliate> for AppliedCode {
    fn from(affiliate: &Affiliate) -> Self {
        Self::Affiliate {
            code: affiliate.code.clone(),
            customer_discount_code: affiliate.customer_discount_code.clone(),
        }
    }
}

/// Code lookups over the promotion repositories.
pub struct PromotionService<'a> {
    influencers: InfluencerRepository<'a>,
    affiliates: AffiliateRepository<'a>,
}

impl<'a> PromotionService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            influencers: InfluencerRepository::new(pool),
            affiliates: AffiliateRepository::new(pool),
        }
    }

    /// Influencer code that can be redeemed right now.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::NotFound` for unknown codes and
    /// `PromoError::Rejected` when the terms don't allow redemption.
    #[instrument(skip(self))]
    pub async fn validate_influencer(&self, raw: &str) -> Result<Influencer, PromoError> {
        let code = normalize_code(raw)?;
        let influencer = self
            .influencers
            .get_by_code(&code)
            .await?
            .ok_or(PromoError::NotFound)?;
        influencer.terms().check(Utc::now())?;
        Ok(influencer)
    }

    /// Active affiliate for a referral code.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::NotFound` for unknown or inactive codes.
    pub async fn resolve_affiliate(&self, raw: &str) -> Result<Affiliate, PromoError> {
        let code = normalize_code(raw)?;
        self.affiliates
            .get_active_by_code(&code)
            .await?
            .ok_or(PromoError::NotFound)
    }

    /// Resolve a referral link and count the click.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::NotFound` for unknown or inactive codes.
    #[instrument(skip(self))]
    pub async fn record_referral(&self, raw: &str) -> Result<Affiliate, PromoError> {
        let affiliate = self.resolve_affiliate(raw).await?;
        self.affiliates.record_click(affiliate.id).await?;
        debug!(affiliate_id = %affiliate.id, "Recorded referral click");
        Ok(affiliate)
    }

    /// Accept a code typed on the cart, trying influencer codes first.
    ///
    /// An influencer code that exists but is rejected by its terms is not
    /// retried as an affiliate code.
    ///
    /// # Errors
    ///
    /// Returns the influencer rejection, or `PromoError::NotFound` when the
    /// code matches nothing.
    pub async fn apply_code(&self, raw: &str) -> Result<AppliedCode, PromoError> {
        match self.validate_influencer(raw).await {
            Ok(influencer) => Ok(AppliedCode::from(&influencer)),
            Err(PromoError::NotFound) => {
                let affiliate = self.resolve_affiliate(raw).await?;
                Ok(AppliedCode::from(&affiliate))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use greenleaf_core::InfluencerId;

    use super::*;

    #[test]
    fn test_applied_code_shopify_discount() {
        let influencer = AppliedCode::Influencer {
            code: "LEAFY".to_owned(),
            discount_percent: Decimal::TEN,
            free_product_variant_id: None,
            remaining_uses: None,
        };
        assert_eq!(influencer.code(), "LEAFY");
        assert_eq!(influencer.shopify_discount_code(), Some("LEAFY"));

        let affiliate = AppliedCode::Affiliate {
            code: "SAM".to_owned(),
            customer_discount_code: None,
        };
        assert_eq!(affiliate.shopify_discount_code(), None);
    }

    #[test]
    fn test_applied_code_serializes_with_kind() {
        let code = AppliedCode::Affiliate {
            code: "SAM".to_owned(),
            customer_discount_code: Some("SAM10".to_owned()),
        };
        let json = serde_json::to_value(&code).unwrap_or_default();
        assert_eq!(json["kind"], "affiliate");
        assert_eq!(json["customer_discount_code"], "SAM10");
    }

    #[test]
    fn test_influencer_code_reports_remaining_uses() {
        let mut influencer = Influencer {
            id: InfluencerId::new(3),
            code: "LEAFY".to_owned(),
            name: "Leafy".to_owned(),
            email: None,
            discount_percent: Decimal::TEN,
            free_product_variant_id: Some("gid://shopify/ProductVariant/5".to_owned()),
            max_uses: Some(50),
            uses: 48,
            active: true,
            starts_at: None,
            expires_at: None,
            created_at: Utc::now(),
        };

        let applied = AppliedCode::from(&influencer);
        let json = serde_json::to_value(&applied).unwrap_or_default();
        assert_eq!(json["kind"], "influencer");
        assert_eq!(json["remaining_uses"], 2);

        influencer.max_uses = None;
        match AppliedCode::from(&influencer) {
            AppliedCode::Influencer { remaining_uses, .. } => assert_eq!(remaining_uses, None),
            AppliedCode::Affiliate { .. } => panic!("expected an influencer code"),
        }
    }
}
