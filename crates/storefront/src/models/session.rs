//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use greenleaf_core::{DonationSource, Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Product GIDs saved by a visitor who is not signed in.
///
/// Merged into the account wishlist on login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestWishlist {
    pub product_ids: Vec<String>,
}

impl GuestWishlist {
    /// Add a product, returning `false` if it was already saved.
    pub fn add(&mut self, product_id: &str) -> bool {
        if self.product_ids.iter().any(|id| id == product_id) {
            return false;
        }
        self.product_ids.push(product_id.to_owned());
        true
    }

    /// Remove a product, returning `false` if it was not saved.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.product_ids.len();
        self.product_ids.retain(|id| id != product_id);
        self.product_ids.len() != before
    }
}

/// The donation a shopper has chosen for the current cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum DonationChoice {
    #[default]
    None,
    /// Round the discounted subtotal up to the next multiple of ten.
    RoundUp,
    /// A validated fixed amount.
    Fixed(Decimal),
}

impl DonationChoice {
    /// Donation owed on a discounted subtotal, given the round-up amount for it.
    #[must_use]
    pub const fn amount(self, round_up: Decimal) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::RoundUp => round_up,
            Self::Fixed(amount) => amount,
        }
    }

    /// Source recorded on the order, `None` when not donating.
    #[must_use]
    pub const fn source(self) -> Option<DonationSource> {
        match self {
            Self::None => None,
            Self::RoundUp => Some(DonationSource::RoundUp),
            Self::Fixed(_) => Some(DonationSource::Fixed),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for storing the Shopify cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for the shopper's [`DonationChoice`](super::DonationChoice).
    pub const DONATION: &str = "donation";

    /// Key for the affiliate code from a referral link.
    pub const AFFILIATE_CODE: &str = "affiliate_code";

    /// Key for the influencer code entered on the cart.
    pub const INFLUENCER_CODE: &str = "influencer_code";

    /// Key for a signed-out visitor's wishlist.
    pub const GUEST_WISHLIST: &str = "guest_wishlist";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_wishlist_add_remove() {
        let mut list = GuestWishlist::default();
        assert!(list.add("gid://shopify/Product/1"));
        assert!(!list.add("gid://shopify/Product/1"));
        assert!(list.add("gid://shopify/Product/2"));
        assert_eq!(list.product_ids.len(), 2);

        assert!(list.remove("gid://shopify/Product/1"));
        assert!(!list.remove("gid://shopify/Product/1"));
        assert_eq!(list.product_ids, vec!["gid://shopify/Product/2".to_owned()]);
    }

    #[test]
    fn test_donation_choice_amount() {
        let round_up = Decimal::new(660, 2);
        assert_eq!(DonationChoice::None.amount(round_up), Decimal::ZERO);
        assert_eq!(DonationChoice::RoundUp.amount(round_up), round_up);
        assert_eq!(DonationChoice::Fixed(Decimal::from(5)).amount(round_up), Decimal::from(5));
        assert_eq!(DonationChoice::Fixed(Decimal::ONE).source(), Some(DonationSource::Fixed));
        assert_eq!(DonationChoice::None.source(), None);
    }
}
