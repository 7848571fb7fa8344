//! Fixed-point ratios at basis-point scale.
//!
//! Every ratio in the engine (reserve ratio, subordination, fulfillment) is
//! computed as `numerator * RATIO_SCALE / denominator` with integer division,
//! then carried as a [`Ratio`]. Four decimal digits is the precision the
//! displayed figures use; finer precision is intentionally discarded.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::decimal;
use crate::error::DecimalError;
use crate::types::Amount;

/// Scale of a [`Ratio`]: 10^4 (basis points).
pub const RATIO_SCALE: u64 = 10_000;

/// Number of decimal digits carried by a [`Ratio`].
pub const RATIO_DECIMALS: u32 = 4;

/// A non-negative fraction with 4 decimal digits of precision.
///
/// `Ratio::from_raw(1_000)` is `0.1`, `Ratio::ONE` is `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ratio(u64);

impl Ratio {
    pub const ZERO: Ratio = Ratio(0);
    pub const ONE: Ratio = Ratio(RATIO_SCALE);

    pub const fn from_raw(raw: u64) -> Self {
        Ratio(raw)
    }

    /// Raw value in basis points.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// `numerator / denominator`, truncated to basis points.
    ///
    /// A zero denominator yields [`Ratio::ZERO`]; ratios too large for `u64`
    /// basis points saturate.
    pub fn from_fraction(numerator: &BigUint, denominator: &BigUint) -> Ratio {
        if denominator.is_zero() {
            return Ratio::ZERO;
        }
        let scaled = numerator * BigUint::from(RATIO_SCALE) / denominator;
        Ratio(scaled.to_u64().unwrap_or_else(|| {
            warn!(%scaled, "ratio exceeds representable range, saturating");
            u64::MAX
        }))
    }

    /// Convenience wrapper over [`Ratio::from_fraction`] for amounts.
    pub fn of(numerator: &Amount, denominator: &Amount) -> Ratio {
        Self::from_fraction(numerator.as_biguint(), denominator.as_biguint())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_one(self) -> bool {
        self.0 == RATIO_SCALE
    }

    /// True when the ratio lies in `[0, 1]`.
    pub fn is_unit_interval(self) -> bool {
        self.0 <= RATIO_SCALE
    }

    /// `amount * self`, truncating.
    pub fn apply(self, amount: &Amount) -> Amount {
        amount.mul_div(&BigUint::from(self.0), &BigUint::from(RATIO_SCALE))
    }

    /// `1 - self`, clamped at zero.
    pub fn complement(self) -> Ratio {
        Ratio(RATIO_SCALE.saturating_sub(self.0))
    }

    /// Exact decimal value, trailing zeros removed.
    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), RATIO_DECIMALS).normalize()
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Ratio {
    type Err = DecimalError;

    /// Parses a human decimal (`"0.25"`, `"1"`, `"2.5e-1"`). Digits past the
    /// fourth decimal are truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = decimal::to_base_units(s, RATIO_DECIMALS)?;
        raw.as_biguint()
            .to_u64()
            .map(Ratio)
            .ok_or_else(|| DecimalError::InvalidAmountFormat(format!("ratio out of range: {s}")))
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fraction() {
        let r = Ratio::of(&Amount::from(100u64), &Amount::from(1000u64));
        assert_eq!(r.raw(), 1_000);
        assert_eq!(r.to_string(), "0.1");
    }

    #[test]
    fn test_from_fraction_saturates() {
        let huge = BigUint::from(u64::MAX) * BigUint::from(u64::MAX);
        assert_eq!(Ratio::from_fraction(&huge, &BigUint::from(1u32)).raw(), u64::MAX);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(Ratio::of(&Amount::from(5u64), &Amount::zero()), Ratio::ZERO);
    }

    #[test]
    fn test_truncates_to_basis_points() {
        // 1/3 = 0.33333... -> 0.3333
        let r = Ratio::of(&Amount::from(1u64), &Amount::from(3u64));
        assert_eq!(r.raw(), 3_333);
    }

    #[test]
    fn test_apply() {
        let half = Ratio::from_raw(5_000);
        assert_eq!(half.apply(&Amount::from(101u64)), Amount::from(50u64));
        assert_eq!(Ratio::ONE.apply(&Amount::from(7u64)), Amount::from(7u64));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("0.25".parse::<Ratio>().unwrap(), Ratio::from_raw(2_500));
        assert_eq!("1".parse::<Ratio>().unwrap(), Ratio::ONE);
        assert_eq!("0.123456".parse::<Ratio>().unwrap(), Ratio::from_raw(1_234));
        assert_eq!(Ratio::ONE.to_string(), "1");
        assert_eq!(Ratio::ZERO.to_string(), "0");
        assert!("abc".parse::<Ratio>().is_err());
    }

    #[test]
    fn test_complement() {
        assert_eq!(Ratio::from_raw(2_000).complement(), Ratio::from_raw(8_000));
        assert_eq!(Ratio::from_raw(12_000).complement(), Ratio::ZERO);
    }

    #[test]
    fn test_serde_roundtrip() {
        let r = Ratio::from_raw(1_250);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"0.125\"");
        assert_eq!(serde_json::from_str::<Ratio>(&json).unwrap(), r);
    }
}
