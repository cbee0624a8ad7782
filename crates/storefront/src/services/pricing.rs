//! Cart pricing.
//!
//! Turns a Shopify cart into [`CartTotals`] using the discount rules stored in
//! the database. Rules change rarely, so they are cached for 60 seconds; the
//! admin can't expect instant propagation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use greenleaf_core::pricing::{CartTotals, MemberPrices, PricedLine, PricingRules, compute_totals};
use greenleaf_core::round_money;
use greenleaf_core::webhook::DONATION_LINE_PROPERTY;

use crate::db::{PricingRepository, RepositoryError};
use crate::models::DonationChoice;
use crate::shopify::{Cart, CartLine};

/// Cart line attribute marking a free product added by an influencer code.
pub const GIFT_LINE_ATTRIBUTE: &str = "_influencer_gift";

const RULES_KEY: &str = "rules";

/// Pricing rules cache plus the cart math on top of it.
#[derive(Clone)]
pub struct PricingService {
    rules: Cache<&'static str, Arc<PricingRules>>,
}

impl Default for PricingService {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingService {
    /// Create a service with an empty 60-second rules cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    /// Active volume tiers and bundles.
    ///
    /// Rows that no longer satisfy the rule constraints are skipped with a
    /// warning rather than failing the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading the rules fails.
    #[instrument(skip(self, pool))]
    pub async fn rules(&self, pool: &PgPool) -> Result<Arc<PricingRules>, RepositoryError> {
        if let Some(rules) = self.rules.get(RULES_KEY).await {
            return Ok(rules);
        }

        let repo = PricingRepository::new(pool);

        let mut volume_tiers = Vec::new();
        for row in repo.active_volume_discounts().await? {
            match row.to_tier() {
                Ok(tier) => volume_tiers.push(tier),
                Err(e) => warn!(id = %row.id, error = %e, "Skipping invalid volume discount"),
            }
        }

        let mut bundles = Vec::new();
        for row in repo.active_bundles().await? {
            let rule = row.to_rule();
            match rule.validate() {
                Ok(()) => bundles.push(rule),
                Err(e) => warn!(id = %row.id, error = %e, "Skipping invalid bundle"),
            }
        }

        debug!(
            tiers = volume_tiers.len(),
            bundles = bundles.len(),
            "Loaded pricing rules"
        );

        let rules = Arc::new(PricingRules {
            volume_tiers,
            bundles,
        });
        self.rules.insert(RULES_KEY, Arc::clone(&rules)).await;
        Ok(rules)
    }

    /// Member prices for a set of variant GIDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn member_prices(
        &self,
        pool: &PgPool,
        variant_ids: &[String],
    ) -> Result<MemberPrices, RepositoryError> {
        let rows = PricingRepository::new(pool)
            .member_prices_for_variants(variant_ids)
            .await?;
        Ok(rows.into_iter().map(|row| (row.variant_id, row.price)).collect())
    }

    /// Totals for `cart`.
    ///
    /// Member prices apply only when `member` is true. The donation is taken
    /// from the shopper's [`DonationChoice`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if rules or member prices can't be loaded.
    #[instrument(skip(self, pool, cart), fields(cart_id = %cart.id))]
    pub async fn cart_totals(
        &self,
        pool: &PgPool,
        cart: &Cart,
        member: bool,
        donation: DonationChoice,
    ) -> Result<CartTotals, RepositoryError> {
        let lines = priced_lines(cart);
        let rules = self.rules(pool).await?;

        let member_prices = if member {
            let variant_ids: Vec<String> = lines.iter().map(|l| l.variant_id.clone()).collect();
            Some(self.member_prices(pool, &variant_ids).await?)
        } else {
            None
        };

        let totals = compute_totals(
            &lines,
            &rules,
            member_prices.as_ref(),
            matches!(donation, DonationChoice::RoundUp),
        );
        Ok(with_donation(totals, donation))
    }
}

/// Cart lines as the discount engine sees them.
///
/// Influencer gift lines are left out; their price is covered by the code.
/// So is the donation line, which the totals carry separately.
#[must_use]
pub fn priced_lines(cart: &Cart) -> Vec<PricedLine> {
    cart.lines
        .iter()
        .filter(|line| !is_gift_line(line) && !is_donation_line(line))
        .filter_map(|line| {
            let quantity = u32::try_from(line.quantity).ok().filter(|q| *q > 0)?;
            Some(PricedLine {
                product_id: line.merchandise.product.id.clone(),
                variant_id: line.merchandise.id.clone(),
                quantity,
                unit_price: line.cost.amount_per_quantity.amount,
            })
        })
        .collect()
}

/// True for a free product line added by an influencer code.
#[must_use]
pub fn is_gift_line(line: &CartLine) -> bool {
    line.attributes.iter().any(|a| a.key == GIFT_LINE_ATTRIBUTE)
}

/// True for the donation line synced onto the cart at checkout.
#[must_use]
pub fn is_donation_line(line: &CartLine) -> bool {
    line.attributes.iter().any(|a| a.key == DONATION_LINE_PROPERTY)
}

/// Settle the donation on the shopper's choice; `totals` carries the
/// round-up amount.
fn with_donation(mut totals: CartTotals, donation: DonationChoice) -> CartTotals {
    totals.donation = round_money(donation.amount(totals.donation).max(Decimal::ZERO));
    totals.total = totals.discounted_subtotal + totals.donation;
    totals
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::{
        Attribute, CartCost, CartLineCost, CartMerchandise, CartMerchandiseProduct, Money,
    };

    fn money(cents: i64) -> Money {
        Money {
            amount: Decimal::new(cents, 2),
            currency_code: "USD".to_owned(),
        }
    }

    fn line(product: &str, quantity: i64, cents: i64, attributes: Vec<Attribute>) -> CartLine {
        CartLine {
            id: format!("gid://shopify/CartLine/{product}"),
            quantity,
            attributes,
            cost: CartLineCost {
                amount_per_quantity: money(cents),
                total_amount: money(cents * quantity),
            },
            merchandise: CartMerchandise {
                id: format!("gid://shopify/ProductVariant/{product}"),
                title: "Default".to_owned(),
                price: money(cents),
                image: None,
                product: CartMerchandiseProduct {
                    id: format!("gid://shopify/Product/{product}"),
                    handle: format!("product-{product}"),
                    title: format!("Product {product}"),
                },
            },
        }
    }

    fn cart(lines: Vec<CartLine>) -> Cart {
        Cart {
            id: "gid://shopify/Cart/abc".to_owned(),
            checkout_url: "https://shop.example/checkout".to_owned(),
            total_quantity: lines.iter().map(|l| l.quantity).sum(),
            note: None,
            attributes: Vec::new(),
            discount_codes: Vec::new(),
            cost: CartCost {
                subtotal_amount: money(0),
                total_amount: money(0),
            },
            lines,
        }
    }

    #[test]
    fn test_priced_lines_skip_gifts_donations_and_empty_lines() {
        let gift = Attribute {
            key: GIFT_LINE_ATTRIBUTE.to_owned(),
            value: Some("LEAFY".to_owned()),
        };
        let donation = Attribute {
            key: DONATION_LINE_PROPERTY.to_owned(),
            value: Some("round_up".to_owned()),
        };
        let cart = cart(vec![
            line("1", 2, 1250, Vec::new()),
            line("2", 1, 900, vec![gift]),
            line("3", 0, 500, Vec::new()),
            line("4", 500, 1, vec![donation]),
        ]);
        assert!(is_donation_line(cart.lines.last().unwrap()));
        assert!(!is_donation_line(cart.lines.first().unwrap()));

        let lines = priced_lines(&cart);
        assert_eq!(lines.len(), 1);
        let first = lines.first().unwrap();
        assert_eq!(first.product_id, "gid://shopify/Product/1");
        assert_eq!(first.quantity, 2);
        assert_eq!(first.unit_price, Decimal::new(1250, 2));
    }

    #[test]
    fn test_fixed_donation_replaces_round_up() {
        let lines = priced_lines(&cart(vec![line("1", 1, 2340, Vec::new())]));
        let totals = compute_totals(&lines, &PricingRules::default(), None, false);
        assert_eq!(totals.donation, Decimal::ZERO);

        let totals = with_donation(totals, DonationChoice::Fixed(Decimal::from(5)));
        assert_eq!(totals.donation, Decimal::from(5));
        assert_eq!(totals.total, Decimal::new(2840, 2));
    }

    #[test]
    fn test_round_up_donation_is_untouched() {
        let lines = priced_lines(&cart(vec![line("1", 1, 2340, Vec::new())]));
        let totals = compute_totals(&lines, &PricingRules::default(), None, true);
        let totals = with_donation(totals, DonationChoice::RoundUp);
        assert_eq!(totals.donation, Decimal::new(660, 2));
        assert_eq!(totals.total, Decimal::from(30));
    }

    #[test]
    fn test_no_donation_clears_amount() {
        let lines = priced_lines(&cart(vec![line("1", 1, 2340, Vec::new())]));
        let totals = compute_totals(&lines, &PricingRules::default(), None, true);
        let totals = with_donation(totals, DonationChoice::None);
        assert_eq!(totals.donation, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(2340, 2));
    }
}
