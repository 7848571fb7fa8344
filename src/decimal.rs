//! Decimal engine: human decimal strings <-> integer base units.
//!
//! ## Overview
//!
//! Every amount entering the engine is a decimal literal supplied by a chain
//! indexer or a UI (`"100.5"`, `"2.5e-3"`). This module converts those
//! literals to integer base units scaled by `10^decimals` and back, without a
//! binary floating-point intermediate at any stage.
//!
//! ## Rules
//!
//! - Fractional digits beyond `decimals` are **truncated**, never rounded.
//! - Missing fractional digits are zero-padded.
//! - Scientific notation is normalized at the target precision first, so
//!   `"1.5e-7"` at 6 decimals is `0`, and `"1e3"` is `1000 * 10^decimals`.
//! - Formatting strips trailing fractional zeros and omits the point for
//!   whole numbers.
//!
//! ## Examples
//!
//! ```
//! use tranche_epoch::decimal::{to_base_units, from_base_units};
//!
//! let units = to_base_units("100.5", 18).unwrap();
//! assert_eq!(units.to_string(), "100500000000000000000");
//! assert_eq!(from_base_units(&units, 18), "100.5");
//! ```

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

use crate::error::DecimalError;
use crate::types::amount::pow10;
use crate::types::Amount;

/// Largest supported precision. `10^77` is the largest power of ten below
/// `2^256`, the widest integer on-chain collaborators use.
pub const MAX_DECIMALS: u32 = 77;

/// Largest accepted exponent magnitude in scientific notation.
pub const MAX_EXPONENT: i64 = 1_000;

/// A parsed literal: `(-1)^negative * digits * 10^exponent`.
#[derive(Debug)]
struct ParsedLiteral {
    negative: bool,
    digits: BigUint,
    digit_count: usize,
    exponent: i64,
}

fn invalid(input: &str, reason: &str) -> DecimalError {
    DecimalError::InvalidAmountFormat(format!("{input:?}: {reason}"))
}

fn check_precision(decimals: u32) -> Result<(), DecimalError> {
    if decimals > MAX_DECIMALS {
        return Err(DecimalError::InvalidPrecision(format!(
            "decimals {decimals} exceeds maximum {MAX_DECIMALS}"
        )));
    }
    Ok(())
}

fn parse_literal(input: &str) -> Result<ParsedLiteral, DecimalError> {
    let (negative, body) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        Some(_) => (false, input),
        None => return Err(invalid(input, "empty string")),
    };

    let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
        Some(pos) => (&body[..pos], parse_exponent(input, &body[pos + 1..])?),
        None => (body, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid(input, "no digits"));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid(input, "non-numeric characters"));
    }

    let combined = format!("{int_part}{frac_part}");
    let digits = BigUint::parse_bytes(combined.as_bytes(), 10)
        .ok_or_else(|| invalid(input, "non-numeric characters"))?;

    Ok(ParsedLiteral {
        negative,
        digits,
        digit_count: combined.len(),
        exponent: exponent - frac_part.len() as i64,
    })
}

fn parse_exponent(input: &str, raw: &str) -> Result<i64, DecimalError> {
    let unsigned = raw.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(raw);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "malformed exponent"));
    }
    let exponent: i64 = raw
        .parse()
        .map_err(|_| invalid(input, "exponent out of range"))?;
    if exponent.abs() > MAX_EXPONENT {
        return Err(invalid(input, "exponent out of range"));
    }
    Ok(exponent)
}

/// Scales a parsed literal to `decimals`, truncating toward zero.
fn scale(parsed: &ParsedLiteral, decimals: u32) -> BigUint {
    let shift = parsed.exponent + i64::from(decimals);
    if shift >= 0 {
        // shift is bounded by MAX_EXPONENT + MAX_DECIMALS
        &parsed.digits * pow10(shift as u32)
    } else {
        let drop = shift.unsigned_abs();
        if drop > parsed.digit_count as u64 {
            return BigUint::zero();
        }
        &parsed.digits / pow10(drop as u32)
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert a decimal literal to base units at `decimals` precision.
///
/// # Errors
///
/// * [`DecimalError::InvalidAmountFormat`] - malformed literal, or a negative
///   value other than zero (checked before truncation)
/// * [`DecimalError::InvalidPrecision`] - `decimals > MAX_DECIMALS`
///
/// # Example
///
/// ```
/// use tranche_epoch::decimal::to_base_units;
///
/// assert_eq!(to_base_units("1.5e3", 6).unwrap().to_string(), "1500000000");
/// assert_eq!(to_base_units("0.1234567", 6).unwrap().to_string(), "123456");
/// assert!(to_base_units("12a", 6).is_err());
/// ```
pub fn to_base_units(amount: &str, decimals: u32) -> Result<Amount, DecimalError> {
    check_precision(decimals)?;
    let parsed = parse_literal(amount)?;
    if parsed.negative && !parsed.digits.is_zero() {
        return Err(invalid(amount, "negative amounts are not representable"));
    }
    Ok(Amount::new(scale(&parsed, decimals)))
}

/// Like [`to_base_units`] but keeps the sign.
pub fn to_signed_base_units(amount: &str, decimals: u32) -> Result<BigInt, DecimalError> {
    check_precision(decimals)?;
    let parsed = parse_literal(amount)?;
    let magnitude = BigInt::from(scale(&parsed, decimals));
    Ok(if parsed.negative { -magnitude } else { magnitude })
}

/// Convert a numeric input to base units.
///
/// The value is rendered with Rust's shortest round-trip formatting (which
/// never uses exponent form) and then parsed as a decimal string, so exactly
/// the digits a caller would see when printing the number are converted.
///
/// # Errors
///
/// * [`DecimalError::InvalidPrecision`] - `value` is NaN or infinite
pub fn to_base_units_f64(value: f64, decimals: u32) -> Result<Amount, DecimalError> {
    if !value.is_finite() {
        return Err(DecimalError::InvalidPrecision(format!(
            "non-finite numeric input: {value}"
        )));
    }
    to_base_units(&value.to_string(), decimals)
}

/// Format base units as a human decimal string.
///
/// # Example
///
/// ```
/// use tranche_epoch::decimal::from_base_units;
/// use tranche_epoch::types::Amount;
///
/// assert_eq!(from_base_units(&Amount::from(1_500_000u64), 6), "1.5");
/// assert_eq!(from_base_units(&Amount::from(2_000_000u64), 6), "2");
/// assert_eq!(from_base_units(&Amount::from(5u64), 6), "0.000005");
/// ```
pub fn from_base_units(value: &Amount, decimals: u32) -> String {
    let divisor = pow10(decimals);
    let whole = value.as_biguint() / &divisor;
    let fraction = value.as_biguint() % &divisor;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{whole}.{}", padded.trim_end_matches('0'))
}

/// Format for display with at most `max_fraction_digits` fractional digits
/// (truncated, then trailing zeros stripped).
pub fn format_amount(value: &Amount, decimals: u32, max_fraction_digits: u32) -> String {
    if max_fraction_digits >= decimals {
        return from_base_units(value, decimals);
    }
    let truncated = convert_decimals(value, decimals, max_fraction_digits);
    from_base_units(&truncated, max_fraction_digits)
}

/// Re-express a base-unit value at another precision.
///
/// Scaling up multiplies; scaling down divides and truncates.
pub fn convert_decimals(value: &Amount, source_decimals: u32, target_decimals: u32) -> Amount {
    if target_decimals >= source_decimals {
        Amount::new(value.as_biguint() * pow10(target_decimals - source_decimals))
    } else {
        Amount::new(value.as_biguint() / pow10(source_decimals - target_decimals))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
