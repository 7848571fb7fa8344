//! Base-unit amounts.
//!
//! ## Representation
//!
//! An [`Amount`] is a non-negative integer in a currency's smallest unit,
//! backed by `num_bigint::BigUint`. 18-decimal token balances multiplied by
//! 18-decimal prices or 27-decimal RAY rates do not fit in `u128`.
//!
//! The `decimals` count that gives an amount its human-readable scale is
//! carried next to it (on the [`Pool`](crate::types::Pool)), never inside it.
//!
//! ## Wire Format
//!
//! Amounts serialize as base-10 integer strings so they round-trip losslessly
//! through JSON collaborators.
//!
//! ```
//! use tranche_epoch::types::Amount;
//!
//! let a: Amount = "100500000000000000000".parse().unwrap();
//! assert_eq!(a.to_string(), "100500000000000000000");
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecimalError;

/// Returns `10^exp` as a big integer.
pub fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

/// A non-negative quantity in base units.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    /// The zero amount.
    pub fn zero() -> Self {
        Amount(BigUint::zero())
    }

    pub fn new(value: BigUint) -> Self {
        Amount(value)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Signed view of this amount, used where results may go negative
    /// (projected reserve, absolute returns).
    pub fn to_signed(&self) -> BigInt {
        BigInt::from(self.0.clone())
    }

    /// `self - rhs`, clamped at zero.
    pub fn saturating_sub(&self, rhs: &Amount) -> Amount {
        if rhs.0 >= self.0 {
            Amount::zero()
        } else {
            Amount(&self.0 - &rhs.0)
        }
    }

    /// `self - rhs`, or `None` if `rhs > self`.
    pub fn checked_sub(&self, rhs: &Amount) -> Option<Amount> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Amount(&self.0 - &rhs.0))
        }
    }

    /// `self * mul / div`, truncating. Returns zero when `div` is zero.
    pub fn mul_div(&self, mul: &BigUint, div: &BigUint) -> Amount {
        if div.is_zero() {
            return Amount::zero();
        }
        Amount(&self.0 * mul / div)
    }

    /// Lossy conversion for small values (tests, logging).
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// Big-endian magnitude bytes, used by the solution digest.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(BigUint::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Amount(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = DecimalError;

    /// Parses a base-unit integer string (no sign, no point, no exponent).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::InvalidAmountFormat(format!(
                "expected a base-unit integer, got {s:?}"
            )));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Amount)
            .ok_or_else(|| DecimalError::InvalidAmountFormat(s.to_string()))
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), |acc, a| acc + a.clone())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0), BigUint::from(1u32));
        assert_eq!(pow10(4), BigUint::from(10_000u32));
        assert_eq!(pow10(27).to_string(), format!("1{}", "0".repeat(27)));
    }

    #[test]
    fn test_saturating_and_checked_sub() {
        let a = Amount::from(100u64);
        let b = Amount::from(250u64);
        assert_eq!(a.saturating_sub(&b), Amount::zero());
        assert_eq!(b.saturating_sub(&a), Amount::from(150u64));
        assert_eq!(a.checked_sub(&b), None);
        assert_eq!(b.checked_sub(&a), Some(Amount::from(150u64)));
    }

    #[test]
    fn test_mul_div_truncates() {
        let a = Amount::from(10u64);
        assert_eq!(
            a.mul_div(&BigUint::from(1u32), &BigUint::from(3u32)),
            Amount::from(3u64)
        );
        assert_eq!(a.mul_div(&BigUint::from(1u32), &BigUint::zero()), Amount::zero());
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        assert!("12.5".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("1e18".parse::<Amount>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let a = Amount::from(u128::MAX);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_sum() {
        let amounts = vec![Amount::from(1u64), Amount::from(2u64), Amount::from(3u64)];
        let total: Amount = amounts.iter().sum();
        assert_eq!(total, Amount::from(6u64));
    }
}
