//! Affiliate and influencer code rules.
//!
//! Codes are typed by customers, so they are normalized before lookup:
//! surrounding whitespace is dropped and letters are uppercased. Influencer
//! codes carry redemption terms checked here rather than in the database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::round_money;

/// Longest code accepted.
pub const MAX_CODE_LENGTH: usize = 32;

/// Shortest code accepted.
pub const MIN_CODE_LENGTH: usize = 3;

/// Why a raw code string was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("code cannot be empty")]
    Empty,
    #[error("code must be between 3 and 32 characters")]
    BadLength,
    #[error("code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Normalize a customer-entered code.
///
/// # Errors
///
/// Returns a [`CodeError`] for empty, too short or long, or non-alphanumeric codes.
///
/// # Example
///
/// ```
/// use greenleaf_core::promo::normalize_code;
///
/// assert_eq!(normalize_code("  summer-10 ").unwrap(), "SUMMER-10");
/// assert!(normalize_code("no spaces").is_err());
/// ```
pub fn normalize_code(raw: &str) -> Result<String, CodeError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(CodeError::Empty);
    }
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.chars().count()) {
        return Err(CodeError::BadLength);
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CodeError::InvalidCharacter);
    }
    Ok(code.to_ascii_uppercase())
}

/// Why an otherwise valid influencer code cannot be redeemed right now.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRejection {
    #[error("this code is no longer active")]
    Inactive,
    #[error("this code is not valid yet")]
    NotStarted,
    #[error("this code has expired")]
    Expired,
    #[error("this code has reached its usage limit")]
    UsageLimitReached,
}

/// Redemption terms attached to an influencer code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluencerTerms {
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// `None` means unlimited.
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub discount_percent: Decimal,
    /// Variant GID handed out free with the code.
    pub free_product_variant_id: Option<String>,
}

impl InfluencerTerms {
    /// Check whether the code may be redeemed at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CodeRejection`] that applies, in the order
    /// inactive, not started, expired, usage limit.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), CodeRejection> {
        if !self.active {
            return Err(CodeRejection::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(CodeRejection::NotStarted);
        }
        if self.expires_at.is_some_and(|end| now >= end) {
            return Err(CodeRejection::Expired);
        }
        if self.max_uses.is_some_and(|max| self.uses >= max) {
            return Err(CodeRejection::UsageLimitReached);
        }
        Ok(())
    }

    /// Remaining redemptions, `None` when unlimited.
    #[must_use]
    pub fn remaining_uses(&self) -> Option<i32> {
        self.max_uses.map(|max| (max - self.uses).max(0))
    }
}

/// Commission owed on an order subtotal at `rate_percent`.
///
/// Negative subtotals and rates produce zero.
#[must_use]
pub fn commission_amount(subtotal: Decimal, rate_percent: Decimal) -> Decimal {
    if subtotal <= Decimal::ZERO || rate_percent <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(subtotal * rate_percent.min(Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn terms() -> InfluencerTerms {
        InfluencerTerms {
            active: true,
            starts_at: None,
            expires_at: None,
            max_uses: None,
            uses: 0,
            discount_percent: Decimal::TEN,
            free_product_variant_id: None,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("leafy_15").unwrap(), "LEAFY_15");
        assert_eq!(normalize_code(""), Err(CodeError::Empty));
        assert_eq!(normalize_code("ab"), Err(CodeError::BadLength));
        assert_eq!(
            normalize_code(&"x".repeat(MAX_CODE_LENGTH + 1)),
            Err(CodeError::BadLength)
        );
        assert_eq!(normalize_code("50%OFF"), Err(CodeError::InvalidCharacter));
        assert_eq!(normalize_code("ÉTÉ2024"), Err(CodeError::InvalidCharacter));
    }

    #[test]
    fn test_terms_accept_open_code() {
        assert!(terms().check(Utc::now()).is_ok());
    }

    #[test]
    fn test_terms_inactive_checked_first() {
        let t = InfluencerTerms {
            active: false,
            max_uses: Some(1),
            uses: 5,
            ..terms()
        };
        assert_eq!(t.check(Utc::now()), Err(CodeRejection::Inactive));
    }

    #[test]
    fn test_terms_window() {
        let now = Utc::now();
        let early = InfluencerTerms {
            starts_at: Some(now + Duration::hours(1)),
            ..terms()
        };
        assert_eq!(early.check(now), Err(CodeRejection::NotStarted));

        let late = InfluencerTerms {
            expires_at: Some(now),
            ..terms()
        };
        assert_eq!(late.check(now), Err(CodeRejection::Expired));
    }

    #[test]
    fn test_terms_usage_limit() {
        let t = InfluencerTerms {
            max_uses: Some(3),
            uses: 3,
            ..terms()
        };
        assert_eq!(t.check(Utc::now()), Err(CodeRejection::UsageLimitReached));
        assert_eq!(t.remaining_uses(), Some(0));

        let t = InfluencerTerms { uses: 2, ..t };
        assert!(t.check(Utc::now()).is_ok());
        assert_eq!(t.remaining_uses(), Some(1));
    }

    #[test]
    fn test_commission_amount() {
        assert_eq!(
            commission_amount(Decimal::new(12_345, 2), Decimal::TEN),
            Decimal::new(1235, 2)
        );
        assert_eq!(commission_amount(Decimal::from(-5), Decimal::TEN), Decimal::ZERO);
        assert_eq!(commission_amount(Decimal::from(50), Decimal::ZERO), Decimal::ZERO);
    }
}
