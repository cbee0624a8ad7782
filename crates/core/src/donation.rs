//! Donation amounts.
//!
//! Customers can round their order up to the next multiple of ten, or give a
//! fixed amount. The donation rides along to Shopify as a cart attribute and
//! is recorded when the `orders/paid` webhook arrives.

use rust_decimal::Decimal;

use crate::types::round_money;

/// Largest single donation accepted.
pub const MAX_DONATION: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Round-up step.
const ROUND_UP_STEP: Decimal = Decimal::TEN;

/// Errors for customer-entered donation amounts.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DonationError {
    #[error("donation must be greater than zero")]
    NotPositive,
    #[error("donation cannot exceed 10000")]
    TooLarge,
    #[error("donation cannot have fractions of a cent")]
    TooPrecise,
}

/// Amount that lifts `total` to the next multiple of ten.
///
/// `ceil(total / 10) * 10 - total`, so an order that is already a multiple of
/// ten (or empty) donates nothing.
#[must_use]
pub fn round_up_amount(total: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money((total / ROUND_UP_STEP).ceil() * ROUND_UP_STEP - total)
}

/// Validate a fixed donation amount.
///
/// # Errors
///
/// Returns a [`DonationError`] for zero, negative, oversized, or sub-cent amounts.
pub fn validate_donation_amount(amount: Decimal) -> Result<Decimal, DonationError> {
    if amount <= Decimal::ZERO {
        return Err(DonationError::NotPositive);
    }
    if amount > MAX_DONATION {
        return Err(DonationError::TooLarge);
    }
    if amount.normalize().scale() > 2 {
        return Err(DonationError::TooPrecise);
    }
    Ok(round_money(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up_amount() {
        assert_eq!(round_up_amount(Decimal::new(2340, 2)), Decimal::new(660, 2));
        assert_eq!(round_up_amount(Decimal::new(1, 2)), Decimal::new(999, 2));
        assert_eq!(round_up_amount(Decimal::new(9999, 2)), Decimal::new(1, 2));
    }

    #[test]
    fn test_round_up_multiple_of_ten_is_zero() {
        assert_eq!(round_up_amount(Decimal::from(40)), Decimal::ZERO);
        assert_eq!(round_up_amount(Decimal::new(5000, 2)), Decimal::ZERO);
    }

    #[test]
    fn test_round_up_non_positive_is_zero() {
        assert_eq!(round_up_amount(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(round_up_amount(Decimal::from(-3)), Decimal::ZERO);
    }

    #[test]
    fn test_validate_donation_amount() {
        assert_eq!(
            validate_donation_amount(Decimal::new(500, 2)),
            Ok(Decimal::new(500, 2))
        );
        assert_eq!(
            validate_donation_amount(Decimal::ZERO),
            Err(DonationError::NotPositive)
        );
        assert_eq!(
            validate_donation_amount(Decimal::from(10_001)),
            Err(DonationError::TooLarge)
        );
        assert_eq!(
            validate_donation_amount(Decimal::new(1001, 3)),
            Err(DonationError::TooPrecise)
        );
        assert!(validate_donation_amount(Decimal::new(1000, 3)).is_ok());
    }
}
