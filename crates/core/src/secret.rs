//! Strength checks for secrets read from the environment.
//!
//! Both servers refuse to start with a secret that is short, low in entropy,
//! or obviously copied from a sample `.env` file.

use std::collections::HashMap;

use thiserror::Error;

/// Session signing keys need at least this many characters.
pub const MIN_SESSION_SECRET_LENGTH: usize = 32;

const MIN_BITS_PER_CHAR: f64 = 3.3;

/// Matched case-insensitively anywhere in the value.
const PLACEHOLDERS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeakSecret {
    #[error("appears to be a placeholder (contains '{0}')")]
    Placeholder(&'static str),

    #[error("entropy too low ({0:.2} bits/char, need >= {MIN_BITS_PER_CHAR:.1}); use a randomly generated value")]
    LowEntropy(f64),

    #[error("must be at least {min} characters (got {len})")]
    TooShort { min: usize, len: usize },
}

/// Reject placeholders and values with too little Shannon entropy.
///
/// # Errors
///
/// Returns the first weakness found.
pub fn check_strength(secret: &str) -> Result<(), WeakSecret> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDERS.iter().find(|p| lower.contains(**p)) {
        return Err(WeakSecret::Placeholder(pattern));
    }

    let bits = entropy_bits_per_char(secret);
    if bits < MIN_BITS_PER_CHAR {
        return Err(WeakSecret::LowEntropy(bits));
    }
    Ok(())
}

/// [`check_strength`] plus the session key length minimum.
///
/// # Errors
///
/// Returns `TooShort` before any other weakness.
pub fn check_session_secret(secret: &str) -> Result<(), WeakSecret> {
    let len = secret.chars().count();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(WeakSecret::TooShort {
            min: MIN_SESSION_SECRET_LENGTH,
            len,
        });
    }
    check_strength(secret)
}

/// Shannon entropy of the character distribution, in bits per character.
#[must_use]
pub fn entropy_bits_per_char(value: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG: &str = "Zq8#vN2!kLp4@Wm7$Rt1^Yc9&Hb3*Fd6";

    #[test]
    fn test_entropy() {
        assert!(entropy_bits_per_char("").abs() < f64::EPSILON);
        assert!((entropy_bits_per_char("ab") - 1.0).abs() < 0.01);
        assert!(entropy_bits_per_char("aB3$xY9!mK2@nL5#") > MIN_BITS_PER_CHAR);
    }

    #[test]
    fn test_placeholders_rejected() {
        assert_eq!(
            check_strength("your-webhook-key"),
            Err(WeakSecret::Placeholder("your-"))
        );
        assert!(check_strength("ChangeMe-2026-now").is_err());
    }

    #[test]
    fn test_low_entropy_rejected() {
        let err = check_strength("abababababababababababab").unwrap_err();
        assert!(matches!(err, WeakSecret::LowEntropy(_)));
        assert!(err.to_string().contains("entropy too low"));
    }

    #[test]
    fn test_strong_value_accepted() {
        assert!(check_strength(STRONG).is_ok());
        assert!(check_session_secret(STRONG).is_ok());
    }

    #[test]
    fn test_session_secret_length_checked_first() {
        assert_eq!(
            check_session_secret("changeme"),
            Err(WeakSecret::TooShort { min: 32, len: 8 })
        );
    }
}
