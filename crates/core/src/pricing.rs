//! Cart discount engine.
//!
//! Three independent rules shape what a customer pays before checkout:
//!
//! 1. **Member prices** - signed-in members see a per-variant override price
//!    when it is lower than the list price.
//! 2. **Volume tiers** - once the cart holds at least `min_quantity` items, a
//!    percentage comes off the whole cart. The best qualifying tier wins.
//! 3. **Bundles** - when every product of a bundle is in the cart, a percentage
//!    comes off those products' lines.
//!
//! Volume and bundle discounts never stack: the rule that saves the customer
//! the most money is applied alone. Member prices are applied first and the
//! winning percentage is taken from member-priced lines.
//!
//! Everything here is pure; callers load rules from the database and line
//! items from the Shopify cart.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::donation::round_up_amount;
use crate::types::{BundleId, round_money};

/// Errors raised when validating discount rules.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Percentage outside `0 < p <= 100`.
    #[error("discount percent must be greater than 0 and at most 100, got {0}")]
    InvalidPercent(Decimal),
    /// Quantity threshold below 1.
    #[error("minimum quantity must be at least 1")]
    InvalidQuantity,
    /// Bundle with fewer than two products.
    #[error("a bundle needs at least two distinct products")]
    BundleTooSmall,
    /// Negative or zero price.
    #[error("price must be greater than zero")]
    InvalidPrice,
}

/// Validate a discount percentage.
///
/// # Errors
///
/// Returns [`PricingError::InvalidPercent`] unless `0 < percent <= 100`.
pub fn validate_percent(percent: Decimal) -> Result<Decimal, PricingError> {
    if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(PricingError::InvalidPercent(percent));
    }
    Ok(percent)
}

/// One cart line as seen by the discount engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// Shopify product GID.
    pub product_id: String,
    /// Shopify variant GID.
    pub variant_id: String,
    pub quantity: u32,
    /// Price per unit before any discount.
    pub unit_price: Decimal,
}

impl PricedLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A quantity threshold that unlocks a cart-wide percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub min_quantity: u32,
    pub percent: Decimal,
}

impl VolumeTier {
    /// Build a validated tier.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero threshold or an out-of-range percentage.
    pub fn new(min_quantity: u32, percent: Decimal) -> Result<Self, PricingError> {
        if min_quantity == 0 {
            return Err(PricingError::InvalidQuantity);
        }
        Ok(Self {
            min_quantity,
            percent: validate_percent(percent)?,
        })
    }
}

/// A set of products that earns a percentage off when bought together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRule {
    pub id: BundleId,
    pub name: String,
    pub product_ids: Vec<String>,
    pub percent: Decimal,
}

impl BundleRule {
    /// Check that the rule is usable.
    ///
    /// # Errors
    ///
    /// Returns an error for fewer than two distinct products or a bad percentage.
    pub fn validate(&self) -> Result<(), PricingError> {
        let distinct: HashSet<&str> = self.product_ids.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            return Err(PricingError::BundleTooSmall);
        }
        validate_percent(self.percent)?;
        Ok(())
    }

    /// True when every product of the bundle appears in `lines` with a non-zero quantity.
    #[must_use]
    pub fn matches(&self, lines: &[PricedLine]) -> bool {
        if self.product_ids.is_empty() {
            return false;
        }
        let present: HashSet<&str> = lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| line.product_id.as_str())
            .collect();
        self.product_ids
            .iter()
            .all(|id| present.contains(id.as_str()))
    }

    /// Sum of the lines that belong to this bundle.
    fn covered_subtotal(&self, lines: &[PricedLine]) -> Decimal {
        lines
            .iter()
            .filter(|line| self.product_ids.contains(&line.product_id))
            .map(PricedLine::line_total)
            .sum()
    }
}

/// Discount rules in effect for the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRules {
    pub volume_tiers: Vec<VolumeTier>,
    pub bundles: Vec<BundleRule>,
}

/// Member override prices keyed by variant GID.
pub type MemberPrices = HashMap<String, Decimal>;

/// Which rule produced the applied discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    Volume { min_quantity: u32 },
    Bundle { bundle_id: BundleId, name: String },
}

/// The single discount applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    #[serde(flatten)]
    pub kind: DiscountKind,
    pub percent: Decimal,
    pub amount: Decimal,
}

/// Totals shown on the cart page and forwarded to checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: u32,
    /// List price total.
    pub subtotal: Decimal,
    /// How much member prices saved.
    pub member_savings: Decimal,
    pub discount: Option<AppliedDiscount>,
    /// Subtotal after member prices and the applied discount.
    pub discounted_subtotal: Decimal,
    /// Round-up donation, zero when not opted in.
    pub donation: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Member savings plus the applied discount.
    #[must_use]
    pub fn total_savings(&self) -> Decimal {
        self.member_savings + self.discount.as_ref().map_or(Decimal::ZERO, |d| d.amount)
    }
}

/// Replace list prices with member prices where the member price is lower.
///
/// Returns the re-priced lines and the total saved.
#[must_use]
pub fn apply_member_prices(
    lines: &[PricedLine],
    member_prices: &MemberPrices,
) -> (Vec<PricedLine>, Decimal) {
    let mut savings = Decimal::ZERO;
    let priced = lines
        .iter()
        .map(|line| {
            let mut line = line.clone();
            if let Some(&member) = member_prices.get(&line.variant_id)
                && member >= Decimal::ZERO
                && member < line.unit_price
            {
                savings += (line.unit_price - member) * Decimal::from(line.quantity);
                line.unit_price = member;
            }
            line
        })
        .collect();
    (priced, round_money(savings))
}

/// Highest percentage among tiers the cart quantity qualifies for.
#[must_use]
pub fn volume_tier(lines: &[PricedLine], tiers: &[VolumeTier]) -> Option<VolumeTier> {
    let quantity: u32 = lines.iter().map(|line| line.quantity).sum();
    tiers
        .iter()
        .filter(|tier| tier.min_quantity <= quantity)
        .max_by(|a, b| a.percent.cmp(&b.percent))
        .copied()
}

/// Bundles whose products are all present in the cart.
#[must_use]
pub fn matching_bundles<'a>(lines: &[PricedLine], bundles: &'a [BundleRule]) -> Vec<&'a BundleRule> {
    bundles.iter().filter(|bundle| bundle.matches(lines)).collect()
}

/// Pick the one discount that saves the most.
///
/// Ties go to the volume tier, then to the earlier bundle.
#[must_use]
pub fn best_discount(lines: &[PricedLine], rules: &PricingRules) -> Option<AppliedDiscount> {
    let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
    let percent_of = |base: Decimal, percent: Decimal| round_money(base * percent / Decimal::ONE_HUNDRED);

    let volume = volume_tier(lines, &rules.volume_tiers).map(|tier| AppliedDiscount {
        kind: DiscountKind::Volume {
            min_quantity: tier.min_quantity,
        },
        percent: tier.percent,
        amount: percent_of(subtotal, tier.percent),
    });

    let bundle = matching_bundles(lines, &rules.bundles)
        .into_iter()
        .map(|bundle| AppliedDiscount {
            kind: DiscountKind::Bundle {
                bundle_id: bundle.id,
                name: bundle.name.clone(),
            },
            percent: bundle.percent,
            amount: percent_of(bundle.covered_subtotal(lines), bundle.percent),
        })
        .reduce(|best, next| if next.amount > best.amount { next } else { best });

    match (volume, bundle) {
        (Some(v), Some(b)) => Some(if b.amount > v.amount { b } else { v }),
        (v, b) => v.or(b),
    }
    .filter(|discount| discount.amount > Decimal::ZERO)
}

/// Compute the full cart totals.
///
/// `member_prices` is `None` for guests. `round_up` adds the donation that
/// lifts the discounted subtotal to the next multiple of ten.
#[must_use]
pub fn compute_totals(
    lines: &[PricedLine],
    rules: &PricingRules,
    member_prices: Option<&MemberPrices>,
    round_up: bool,
) -> CartTotals {
    let item_count = lines.iter().map(|line| line.quantity).sum();
    let subtotal = round_money(lines.iter().map(PricedLine::line_total).sum());

    let (priced, member_savings) = match member_prices {
        Some(prices) => apply_member_prices(lines, prices),
        None => (lines.to_vec(), Decimal::ZERO),
    };

    let discount = best_discount(&priced, rules);
    let discounted_subtotal = round_money(
        subtotal - member_savings - discount.as_ref().map_or(Decimal::ZERO, |d| d.amount),
    )
    .max(Decimal::ZERO);

    let donation = if round_up {
        round_up_amount(discounted_subtotal)
    } else {
        Decimal::ZERO
    };

    CartTotals {
        item_count,
        subtotal,
        member_savings,
        discount,
        discounted_subtotal,
        donation,
        total: discounted_subtotal + donation,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: &str, variant: &str, quantity: u32, cents: i64) -> PricedLine {
        PricedLine {
            product_id: product.to_owned(),
            variant_id: variant.to_owned(),
            quantity,
            unit_price: Decimal::new(cents, 2),
        }
    }

    fn tier(min_quantity: u32, percent: i64) -> VolumeTier {
        VolumeTier::new(min_quantity, Decimal::from(percent)).unwrap()
    }

    fn bundle(id: i32, products: &[&str], percent: i64) -> BundleRule {
        BundleRule {
            id: BundleId::new(id),
            name: format!("bundle {id}"),
            product_ids: products.iter().map(|p| (*p).to_owned()).collect(),
            percent: Decimal::from(percent),
        }
    }

    #[test]
    fn test_volume_takes_highest_qualifying_tier() {
        let lines = [line("p1", "v1", 3, 1000), line("p2", "v2", 2, 500)];
        let tiers = [tier(3, 5), tier(5, 10), tier(10, 20)];
        assert_eq!(volume_tier(&lines, &tiers), Some(tier(5, 10)));
    }

    #[test]
    fn test_volume_none_below_threshold() {
        let lines = [line("p1", "v1", 1, 1000)];
        assert_eq!(volume_tier(&lines, &[tier(2, 5)]), None);
    }

    #[test]
    fn test_volume_prefers_percent_over_threshold_order() {
        // A misconfigured lower threshold with a higher percent still wins
        let lines = [line("p1", "v1", 6, 1000)];
        let tiers = [tier(5, 15), tier(6, 10)];
        assert_eq!(volume_tier(&lines, &tiers), Some(tier(5, 15)));
    }

    #[test]
    fn test_bundle_requires_every_product() {
        let b = bundle(1, &["p1", "p2"], 10);
        assert!(b.matches(&[line("p1", "v1", 1, 100), line("p2", "v2", 1, 100)]));
        assert!(!b.matches(&[line("p1", "v1", 1, 100)]));
        assert!(!b.matches(&[line("p1", "v1", 1, 100), line("p2", "v2", 0, 100)]));
    }

    #[test]
    fn test_empty_bundle_never_matches() {
        let b = bundle(1, &[], 10);
        assert!(!b.matches(&[line("p1", "v1", 1, 100)]));
    }

    #[test]
    fn test_bundle_discount_only_covers_bundle_lines() {
        let lines = [
            line("p1", "v1", 1, 2000),
            line("p2", "v2", 1, 3000),
            line("p3", "v3", 1, 5000),
        ];
        let rules = PricingRules {
            volume_tiers: vec![],
            bundles: vec![bundle(1, &["p1", "p2"], 20)],
        };
        let discount = best_discount(&lines, &rules).unwrap();
        assert_eq!(discount.amount, Decimal::new(1000, 2));
        assert!(matches!(discount.kind, DiscountKind::Bundle { .. }));
    }

    #[test]
    fn test_highest_saving_wins_without_stacking() {
        // 4 items at $25 = $100; volume 5% = $5, bundle 20% of $50 = $10
        let lines = [
            line("p1", "v1", 1, 2500),
            line("p2", "v2", 1, 2500),
            line("p3", "v3", 2, 2500),
        ];
        let rules = PricingRules {
            volume_tiers: vec![tier(4, 5)],
            bundles: vec![bundle(7, &["p1", "p2"], 20)],
        };
        let totals = compute_totals(&lines, &rules, None, false);
        let discount = totals.discount.unwrap();
        assert_eq!(discount.amount, Decimal::new(1000, 2));
        assert_eq!(totals.total, Decimal::new(9000, 2));
    }

    #[test]
    fn test_tie_prefers_volume() {
        let lines = [line("p1", "v1", 1, 1000), line("p2", "v2", 1, 1000)];
        let rules = PricingRules {
            volume_tiers: vec![tier(2, 10)],
            bundles: vec![bundle(1, &["p1", "p2"], 10)],
        };
        let discount = best_discount(&lines, &rules).unwrap();
        assert_eq!(discount.kind, DiscountKind::Volume { min_quantity: 2 });
    }

    #[test]
    fn test_member_price_only_when_lower() {
        let lines = [line("p1", "v1", 2, 1000), line("p2", "v2", 1, 1000)];
        let prices: MemberPrices = [
            ("v1".to_owned(), Decimal::new(800, 2)),
            ("v2".to_owned(), Decimal::new(1200, 2)),
        ]
        .into_iter()
        .collect();

        let (priced, savings) = apply_member_prices(&lines, &prices);
        assert_eq!(priced[0].unit_price, Decimal::new(800, 2));
        assert_eq!(priced[1].unit_price, Decimal::new(1000, 2));
        assert_eq!(savings, Decimal::new(400, 2));
    }

    #[test]
    fn test_guests_never_get_member_prices() {
        let lines = [line("p1", "v1", 1, 1000)];
        let totals = compute_totals(&lines, &PricingRules::default(), None, false);
        assert_eq!(totals.member_savings, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(1000, 2));
    }

    #[test]
    fn test_discount_applies_after_member_prices() {
        let lines = [line("p1", "v1", 2, 1000)];
        let prices: MemberPrices = [("v1".to_owned(), Decimal::new(900, 2))].into_iter().collect();
        let rules = PricingRules {
            volume_tiers: vec![tier(2, 10)],
            bundles: vec![],
        };
        let totals = compute_totals(&lines, &rules, Some(&prices), false);
        assert_eq!(totals.subtotal, Decimal::new(2000, 2));
        assert_eq!(totals.member_savings, Decimal::new(200, 2));
        assert_eq!(totals.discount.as_ref().unwrap().amount, Decimal::new(180, 2));
        assert_eq!(totals.discounted_subtotal, Decimal::new(1620, 2));
        assert_eq!(totals.total_savings(), Decimal::new(380, 2));
    }

    #[test]
    fn test_round_up_added_to_total() {
        let lines = [line("p1", "v1", 1, 2340)];
        let totals = compute_totals(&lines, &PricingRules::default(), None, true);
        assert_eq!(totals.donation, Decimal::new(660, 2));
        assert_eq!(totals.total, Decimal::new(3000, 2));
    }

    #[test]
    fn test_discount_amount_rounds_to_cents() {
        // 3 x $3.33 = $9.99, 15% = 1.4985 -> 1.50
        let lines = [line("p1", "v1", 3, 333)];
        let rules = PricingRules {
            volume_tiers: vec![tier(3, 15)],
            bundles: vec![],
        };
        assert_eq!(
            best_discount(&lines, &rules).unwrap().amount,
            Decimal::new(150, 2)
        );
    }

    #[test]
    fn test_rule_validation() {
        assert_eq!(
            VolumeTier::new(0, Decimal::TEN),
            Err(PricingError::InvalidQuantity)
        );
        assert!(VolumeTier::new(2, Decimal::from(101)).is_err());
        assert!(validate_percent(Decimal::ZERO).is_err());
        assert_eq!(
            bundle(1, &["p1", "p1"], 10).validate(),
            Err(PricingError::BundleTooSmall)
        );
        assert!(bundle(1, &["p1", "p2"], 10).validate().is_ok());
    }

    #[test]
    fn test_empty_cart() {
        let totals = compute_totals(&[], &PricingRules::default(), None, true);
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.total, Decimal::ZERO);
        assert!(totals.discount.is_none());
    }
}
