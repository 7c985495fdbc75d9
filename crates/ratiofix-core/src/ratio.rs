//! Ratio math: reduced ratio keys, ratio values, and tolerance checks.
//!
//! A [`RatioKey`] is the canonical `width:height` form of an aspect ratio,
//! reduced to lowest integer terms, so `800:600`, `8:6`, and `4:3` all
//! normalize to the same key. All classification in the catalog goes through
//! [`within_tolerance`] against the canonical ratio's real value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a ratio key from its string form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseRatioError {
    /// The input is not of the form `width:height`.
    #[error("malformed ratio key: {0:?}")]
    Malformed(String),

    /// Either term is zero or not a positive integer.
    #[error("ratio terms must be positive integers: {0:?}")]
    NonPositive(String),
}

/// An aspect ratio reduced to lowest integer terms.
///
/// The string form (`Display`, serde) is `"4:3"`. Construction always
/// reduces, so two keys compare equal whenever they describe the same ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RatioKey {
    width: u32,
    height: u32,
}

impl RatioKey {
    /// Build a key from pixel dimensions. Returns `None` when either
    /// dimension is zero, since no ratio is defined there.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let d = gcd(width, height);
        Some(Self {
            width: width / d,
            height: height / d,
        })
    }

    /// The reduced `(width, height)` terms.
    pub fn terms(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The ratio as a real number (`width / height`). Always positive.
    pub fn value(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for RatioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for RatioKey {
    type Err = ParseRatioError;

    /// Parse `"w:h"` and re-reduce, so a persisted `"8:6"` resolves equal
    /// to `"4:3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| ParseRatioError::Malformed(s.to_owned()))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ParseRatioError::Malformed(s.to_owned()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ParseRatioError::Malformed(s.to_owned()))?;
        Self::from_dimensions(width, height).ok_or_else(|| ParseRatioError::NonPositive(s.to_owned()))
    }
}

impl TryFrom<String> for RatioKey {
    type Error = ParseRatioError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RatioKey> for String {
    fn from(key: RatioKey) -> Self {
        key.to_string()
    }
}

/// The aspect ratio of raw dimensions as a real number.
///
/// Returns 0.0 for non-positive inputs so callers can treat "no ratio" as a
/// value that never passes a tolerance check.
pub fn ratio_value(width: u32, height: u32) -> f64 {
    if width == 0 || height == 0 {
        return 0.0;
    }
    f64::from(width) / f64::from(height)
}

/// Relative-tolerance comparison used for matching vs. offending
/// classification: `|value - canonical| / canonical <= epsilon`.
///
/// Non-positive values never match.
pub fn within_tolerance(value: f64, canonical: f64, epsilon: f64) -> bool {
    if !value.is_finite() || !canonical.is_finite() || value <= 0.0 || canonical <= 0.0 {
        return false;
    }
    (value - canonical).abs() / canonical <= epsilon
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_reduces_to_lowest_terms() {
        let key = RatioKey::from_dimensions(800, 600).unwrap();
        assert_eq!(key.terms(), (4, 3));
        assert_eq!(key.to_string(), "4:3");
    }

    #[test]
    fn test_equal_ratios_share_a_key() {
        let a = RatioKey::from_dimensions(1920, 1080).unwrap();
        let b = RatioKey::from_dimensions(16, 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_dimension_has_no_key() {
        assert_eq!(RatioKey::from_dimensions(0, 600), None);
        assert_eq!(RatioKey::from_dimensions(800, 0), None);
    }

    #[test]
    fn test_parse_re_reduces() {
        let key: RatioKey = "8:6".parse().unwrap();
        assert_eq!(key.to_string(), "4:3");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "4x3".parse::<RatioKey>(),
            Err(ParseRatioError::Malformed(_))
        ));
        assert!(matches!(
            "4:".parse::<RatioKey>(),
            Err(ParseRatioError::Malformed(_))
        ));
        assert!(matches!(
            "0:3".parse::<RatioKey>(),
            Err(ParseRatioError::NonPositive(_))
        ));
    }

    #[test]
    fn test_ratio_value() {
        assert!((ratio_value(1000, 600) - 1.6667).abs() < 1e-3);
        assert_eq!(ratio_value(0, 600), 0.0);
        assert_eq!(ratio_value(800, 0), 0.0);
    }

    #[test]
    fn test_within_tolerance() {
        let canonical = 4.0 / 3.0;
        assert!(within_tolerance(canonical, canonical, 0.03));
        // 1.36 is ~2% off 4:3
        assert!(within_tolerance(1.36, canonical, 0.03));
        // 1:1 is ~25% off 4:3
        assert!(!within_tolerance(1.0, canonical, 0.03));
    }

    #[test]
    fn test_within_tolerance_rejects_non_positive() {
        assert!(!within_tolerance(0.0, 1.0, 0.05));
        assert!(!within_tolerance(1.0, 0.0, 0.05));
        assert!(!within_tolerance(f64::NAN, 1.0, 0.05));
    }
}
