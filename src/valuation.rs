//! Valuation calculator.
//!
//! NAV, reserve ratio, subordination, token-price conversions and returns for
//! a pool snapshot. Every division by a quantity that can legitimately be zero
//! (NAV of an empty pool, price of an unpriced tranche, zero supply) yields a
//! defined zero instead of an error.
//!
//! ## Price Convention
//!
//! `token_price` is the currency value of one whole token, in currency base
//! units. With `decimals = 6`, a price of `1_050_000` means 1.05 currency per
//! token, and `position_value(2_000_000, 1_050_000, 6) == 2_100_000`.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::decimal;
use crate::types::amount::pow10;
use crate::types::{Amount, Epoch, Pool, PoolStateSummary, Ratio, RATIO_SCALE};

// ============================================================================
// Ratios
// ============================================================================

/// `reserve / nav` at basis-point precision; zero for an empty pool.
pub fn reserve_ratio(reserve: &Amount, nav: &Amount) -> Ratio {
    Ratio::of(reserve, nav)
}

/// Share of pool value absorbing first losses; zero when `total_value` is 0.
pub fn subordination(junior_value: &Amount, total_value: &Amount) -> Ratio {
    Ratio::of(junior_value, total_value)
}

// ============================================================================
// Token <-> currency
// ============================================================================

/// `tokens * token_price / 10^decimals`, truncating.
pub fn position_value(tokens: &Amount, token_price: &Amount, decimals: u32) -> Amount {
    tokens.mul_div(token_price.as_biguint(), &pow10(decimals))
}

/// Tokens minted for `invest_amount`: `invest_amount * 10^decimals / price`.
///
/// Returns zero for an unpriced tranche (`token_price == 0`).
pub fn invest_tokens(invest_amount: &Amount, token_price: &Amount, decimals: u32) -> Amount {
    invest_amount.mul_div(&pow10(decimals), token_price.as_biguint())
}

/// Currency paid for `redeem_tokens`: `redeem_tokens * price / 10^decimals`.
pub fn redeem_currency(redeem_tokens: &Amount, token_price: &Amount, decimals: u32) -> Amount {
    position_value(redeem_tokens, token_price, decimals)
}

/// Price implied by a tranche value and its supply; zero when supply is 0.
pub fn token_price(tranche_value: &Amount, token_supply: &Amount, decimals: u32) -> Amount {
    tranche_value.mul_div(&pow10(decimals), token_supply.as_biguint())
}

/// NAV per share as a display string; `"0"` when there are no shares.
pub fn nav_per_share(total_nav: &Amount, total_shares: &Amount, decimals: u32) -> String {
    if total_shares.is_zero() {
        return "0".to_string();
    }
    let per_share = total_nav.mul_div(&pow10(decimals), total_shares.as_biguint());
    decimal::from_base_units(&per_share, decimals)
}

// ============================================================================
// Returns
// ============================================================================

/// Gain or loss of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentReturn {
    /// `current - invested`, in base units.
    #[serde(serialize_with = "serialize_signed")]
    pub absolute_return: BigInt,
    /// Percent with two decimals (`10.00` for +10%).
    pub percentage_return: Decimal,
}

fn serialize_signed<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_str_radix(10))
}

/// Absolute and percentage return of `current_value` over `invested_value`.
///
/// The percentage is computed in basis points (truncated toward zero) and
/// then expressed as a percent. A zero `invested_value` yields a zero
/// percentage.
///
/// # Example
///
/// ```
/// use tranche_epoch::types::Amount;
/// use tranche_epoch::valuation::investment_return;
///
/// let r = investment_return(&Amount::from(110u64), &Amount::from(100u64));
/// assert_eq!(r.percentage_return.to_string(), "10.00");
/// assert_eq!(r.absolute_return.to_string(), "10");
/// ```
pub fn investment_return(current_value: &Amount, invested_value: &Amount) -> InvestmentReturn {
    let absolute_return = current_value.to_signed() - invested_value.to_signed();
    if invested_value.is_zero() {
        return InvestmentReturn {
            absolute_return,
            percentage_return: Decimal::new(0, 2),
        };
    }

    let bps: BigInt = &absolute_return * BigInt::from(RATIO_SCALE) / invested_value.to_signed();
    let bps = bps.to_i64().unwrap_or_else(|| {
        warn!(%bps, "return exceeds representable range, saturating");
        if bps < BigInt::zero() {
            i64::MIN
        } else {
            i64::MAX
        }
    });

    // basis points / 100 = percent, so bps is the percent at scale 2
    InvestmentReturn {
        absolute_return,
        percentage_return: Decimal::new(bps, 2),
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Display summary of a pool at the given epoch.
pub fn pool_state_summary(pool: &Pool, epoch: &Epoch) -> PoolStateSummary {
    PoolStateSummary {
        pool_id: pool.pool_id,
        nav: pool.nav(),
        reserve: pool.reserve.clone(),
        reserve_ratio: pool.reserve_ratio(),
        total_debt: pool.total_debt.clone(),
        number_of_loans: pool.number_of_loans,
        epoch_id: epoch.epoch_id,
        is_epoch_open: epoch.is_open(),
    }
}
