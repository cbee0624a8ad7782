//! Database row models shared by the storefront and admin.
//!
//! With the `postgres` feature every model derives `sqlx::FromRow`, so both
//! binaries can `query_as` straight into them. Column names match field names.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{BundleRule, PricingError, VolumeTier};
use crate::promo::InfluencerTerms;
use crate::types::{
    AffiliateId, BundleId, CommissionId, CommissionStatus, DonationId, DonationSource,
    EmailTemplateId, InfluencerId, LegalDocumentId, OrderId, OrderStatus, RedemptionId,
    ReviewId, ReviewStatus, UserId, VolumeDiscountId,
};

/// `storefront.volume_discount`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct VolumeDiscount {
    pub id: VolumeDiscountId,
    pub min_quantity: i32,
    pub percent: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl VolumeDiscount {
    /// Convert to an engine tier.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored row violates tier rules.
    pub fn to_tier(&self) -> Result<VolumeTier, PricingError> {
        let min_quantity = u32::try_from(self.min_quantity).map_err(|_| PricingError::InvalidQuantity)?;
        VolumeTier::new(min_quantity, self.percent)
    }
}

/// `storefront.bundle_pricing`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct BundlePricing {
    pub id: BundleId,
    pub name: String,
    pub product_ids: Vec<String>,
    pub percent: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl BundlePricing {
    /// Convert to an engine rule.
    #[must_use]
    pub fn to_rule(&self) -> BundleRule {
        BundleRule {
            id: self.id,
            name: self.name.clone(),
            product_ids: self.product_ids.clone(),
            percent: self.percent,
        }
    }
}

/// `storefront.member_price`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct MemberPrice {
    pub variant_id: String,
    pub product_id: String,
    pub price: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// `storefront.affiliate`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Affiliate {
    pub id: AffiliateId,
    pub code: String,
    pub name: String,
    pub email: String,
    /// Percent of the commissionable subtotal.
    pub commission_rate: Decimal,
    /// Shopify discount code shoppers get through this affiliate's link.
    pub customer_discount_code: Option<String>,
    pub active: bool,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

/// `storefront.affiliate_commission`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct AffiliateCommission {
    pub id: CommissionId,
    pub affiliate_id: AffiliateId,
    pub order_id: OrderId,
    pub order_subtotal: Decimal,
    pub commission_rate: Decimal,
    pub amount: Decimal,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// `storefront.influencer`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Influencer {
    pub id: InfluencerId,
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub discount_percent: Decimal,
    pub free_product_variant_id: Option<String>,
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Influencer {
    /// Redemption terms for validation.
    #[must_use]
    pub fn terms(&self) -> InfluencerTerms {
        InfluencerTerms {
            active: self.active,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            max_uses: self.max_uses,
            uses: self.uses,
            discount_percent: self.discount_percent,
            free_product_variant_id: self.free_product_variant_id.clone(),
        }
    }
}

/// `storefront.influencer_redemption`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct InfluencerRedemption {
    pub id: RedemptionId,
    pub influencer_id: InfluencerId,
    pub order_id: OrderId,
    pub order_subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// `storefront.order`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: OrderId,
    pub shopify_order_id: i64,
    pub order_number: String,
    pub email: Option<String>,
    pub user_id: Option<UserId>,
    pub currency_code: String,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub refunded_total: Decimal,
    pub status: OrderStatus,
    pub affiliate_code: Option<String>,
    pub influencer_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `storefront.order_line`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub order_id: OrderId,
    pub shopify_line_id: i64,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// `storefront.donation`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Donation {
    pub id: DonationId,
    pub order_id: Option<OrderId>,
    pub amount: Decimal,
    pub currency_code: String,
    pub source: DonationSource,
    /// Shown on the public feed; `None` for anonymous donors.
    pub donor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `storefront.product_sales`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ProductSales {
    pub product_id: String,
    pub title: String,
    pub units_sold: i64,
    pub revenue: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// `storefront.review`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Review {
    pub id: ReviewId,
    pub product_id: String,
    pub user_id: Option<UserId>,
    pub author_name: String,
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// `storefront.email_template`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct EmailTemplate {
    pub id: EmailTemplateId,
    /// Stable lookup key, e.g. `order_confirmation`.
    pub key: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub updated_at: DateTime<Utc>,
}

/// `storefront.legal_document`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct LegalDocument {
    pub id: LegalDocumentId,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub version: i32,
    /// `None` while a draft.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_discount_to_tier() {
        let row = VolumeDiscount {
            id: VolumeDiscountId::new(1),
            min_quantity: 5,
            percent: Decimal::TEN,
            active: true,
            created_at: Utc::now(),
        };
        assert_eq!(row.to_tier().unwrap().min_quantity, 5);

        let bad = VolumeDiscount {
            min_quantity: -1,
            ..row
        };
        assert_eq!(bad.to_tier(), Err(PricingError::InvalidQuantity));
    }
}
