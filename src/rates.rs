//! Interest rate conversion between per-second RAY rates and APR.
//!
//! ## Representation
//!
//! On-chain tranches accrue interest every second. The rate is stored as a
//! fixed-point integer scaled by `RAY = 10^27`: `RAY` itself means 0% and
//! `RAY + RAY / SECONDS_PER_YEAR` means roughly 100% a year.
//!
//! ## Linear Approximation
//!
//! Both conversions annualize **linearly**:
//!
//! ```text
//! apr  = (rate - RAY) * SECONDS_PER_YEAR / RAY * 100
//! rate = RAY + floor(apr / 100 * RAY) / SECONDS_PER_YEAR
//! ```
//!
//! True per-second compounding would give a slightly higher effective yield.
//! The linear form matches the figures collaborators already display, so it is
//! kept bit-for-bit; switching to geometric compounding changes externally
//! visible yields.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive};
use rust_decimal::Decimal;

use crate::decimal;
use crate::error::DecimalError;
use crate::types::amount::pow10;
use crate::types::Amount;

/// Fixed-point scale of per-second rates: 10^27.
pub fn ray() -> BigUint {
    pow10(RAY_DECIMALS)
}

pub const RAY_DECIMALS: u32 = 27;

/// 365 days; leap years are ignored.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

/// APR percent (two decimals) for a per-second RAY rate.
///
/// Rates below `RAY` produce a negative APR. The result is rounded half away
/// from zero at the second decimal.
///
/// # Example
///
/// ```
/// use tranche_epoch::rates::{apr_to_per_sec_rate, per_sec_rate_to_apr};
///
/// let rate = apr_to_per_sec_rate("5").unwrap();
/// assert_eq!(per_sec_rate_to_apr(&rate).to_string(), "5.00");
/// ```
pub fn per_sec_rate_to_apr(rate_per_sec: &Amount) -> Decimal {
    let ray = BigInt::from(ray());
    let excess = rate_per_sec.to_signed() - &ray;

    // percent * 100 -> two decimal digits
    let numerator = excess * BigInt::from(SECONDS_PER_YEAR) * BigInt::from(10_000u32);
    let (mut hundredths, remainder) = numerator.div_rem(&ray);
    if remainder.abs() * 2u32 >= ray {
        if remainder.is_negative() {
            hundredths -= 1u32;
        } else {
            hundredths += 1u32;
        }
    }

    let hundredths = hundredths.to_i64().unwrap_or_else(|| {
        if hundredths.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        }
    });
    Decimal::new(hundredths, 2)
}

/// Per-second RAY rate for an APR percent given as a decimal string.
///
/// # Errors
///
/// * [`DecimalError::InvalidAmountFormat`] - malformed or negative APR
pub fn apr_to_per_sec_rate(apr: &str) -> Result<Amount, DecimalError> {
    // apr / 100 * RAY == apr scaled to 25 decimals
    let per_year = decimal::to_base_units(apr, RAY_DECIMALS - 2)?;
    let per_sec = per_year.as_biguint() / BigUint::from(SECONDS_PER_YEAR);
    Ok(Amount::new(ray() + per_sec))
}

/// Interest accrued on `principal` over `elapsed_secs` under the same linear
/// model: `principal * (rate - RAY) * elapsed / RAY`. Rates at or below `RAY`
/// accrue nothing.
pub fn accrued_interest(principal: &Amount, rate_per_sec: &Amount, elapsed_secs: u64) -> Amount {
    let ray = ray();
    if rate_per_sec.as_biguint() <= &ray {
        return Amount::zero();
    }
    let excess = rate_per_sec.as_biguint() - &ray;
    Amount::new(principal.as_biguint() * excess * BigUint::from(elapsed_secs) / ray)
}
