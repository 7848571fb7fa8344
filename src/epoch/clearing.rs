//! Epoch clearing engine.
//!
//! Given a pool snapshot and the orders collected during an epoch,
//! [`compute_solution`] decides how much of each tranche's invest and redeem
//! demand can be executed, and [`validate_solution`] checks any solution
//! (computed here or supplied by a third party) against the pool constraints.
//!
//! ## Algorithm
//!
//! 1. **Redemptions**, senior to junior. Paid from a budget of
//!    `min(reserve, nav * max_nav_decrease)`. Redemptions from subordinate
//!    tranches are further capped so the junior share of pool value stays at
//!    or above `min_subordination_ratio`.
//! 2. **Investments**, senior to junior. Accepted up to the reserve headroom
//!    `max_reserve - (reserve - redeemed)`. Senior investments are capped so
//!    they do not dilute the junior share below the minimum.
//! 3. Inside each tranche and direction, every order receives the same
//!    fulfillment ratio via [`pro_rata_share`].
//!
//! Tranches with a `min_risk_buffer` add the same pair of caps on their own
//! level: redemptions below them and investments into them stop where the
//! share of value below the tranche would fall under the buffer.
//!
//! All caps are evaluated in processing order: a senior investment is only
//! backed by junior value that exists before this epoch's junior investments.
//!
//! The computed solution is always validated; violations are recorded on the
//! solution and `is_feasible` is cleared. Nothing is auto-corrected.

use std::collections::HashMap;

use num_bigint::{BigInt, BigUint};
use num_traits::Signed;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::decimal;
use crate::epoch::aggregator::{aggregate_by_tranche, fulfillment_ratio, pro_rata_share, validate_orders};
use crate::epoch::lifecycle::{can_close_epoch, closable_at};
use crate::error::ClearingError;
use crate::types::{
    Amount, Epoch, EpochSolution, EpochState, EpochTiming, Order, OrderFill, OrderId,
    OrderStatus, OrderType, Pool, Ratio, SolutionValidation, TrancheAllocation, TrancheId,
    TrancheType, Violation, RATIO_SCALE,
};
use crate::valuation;

// ============================================================================
// Constraints
// ============================================================================

/// Pool-level limits a solution must respect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionConstraints {
    /// Upper bound on the reserve after execution, in currency base units.
    pub max_reserve: Amount,
    /// Minimum `junior / (senior + junior)` after execution.
    pub min_subordination_ratio: Ratio,
    /// Maximum share of NAV that may leave the pool in one epoch.
    pub max_nav_decrease: Ratio,
}

impl SolutionConstraints {
    pub fn new(max_reserve: Amount, min_subordination_ratio: Ratio, max_nav_decrease: Ratio) -> Self {
        Self {
            max_reserve,
            min_subordination_ratio,
            max_nav_decrease,
        }
    }

    /// Both ratios must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ClearingError> {
        for (name, ratio) in [
            ("minSubordinationRatio", self.min_subordination_ratio),
            ("maxNavDecrease", self.max_nav_decrease),
        ] {
            if !ratio.is_unit_interval() {
                return Err(ClearingError::InvalidConstraints(format!("{name} {ratio} exceeds 1")));
            }
        }
        Ok(())
    }

    /// Build constraints from human decimal strings.
    ///
    /// `max_reserve` is scaled to `decimals`; the ratios are plain fractions
    /// (`"0.2"`). Negative or malformed values are rejected.
    pub fn parse(
        max_reserve: &str,
        min_subordination_ratio: &str,
        max_nav_decrease: &str,
        decimals: u32,
    ) -> Result<Self, ClearingError> {
        let max_reserve = decimal::to_base_units(max_reserve, decimals)
            .map_err(|e| ClearingError::InvalidConstraints(format!("maxReserve: {e}")))?;
        let constraints = Self {
            max_reserve,
            min_subordination_ratio: parse_ratio("minSubordinationRatio", min_subordination_ratio)?,
            max_nav_decrease: parse_ratio("maxNavDecrease", max_nav_decrease)?,
        };
        constraints.validate()?;
        Ok(constraints)
    }
}

fn parse_ratio(name: &str, value: &str) -> Result<Ratio, ClearingError> {
    value
        .parse::<Ratio>()
        .map_err(|e| ClearingError::InvalidConstraints(format!("{name}: {e}")))
}

// ============================================================================
// Projection helpers
// ============================================================================

/// Pool state after a solution executes. Reserve and NAV are signed so an
/// overdrawn reserve is visible.
struct Projection {
    reserve: BigInt,
    nav: BigInt,
    tranche_values: Vec<Amount>,
}

fn project(pool: &Pool, solution: &EpochSolution) -> Projection {
    let delta = solution.total_invest().to_signed() - solution.total_redeem().to_signed();
    let tranche_values = pool
        .tranches
        .iter()
        .map(|t| {
            let value = t.value(pool.currency_decimals);
            match solution.allocation(t.id) {
                Some(a) => (&value + &a.invest_amount).saturating_sub(&a.redeem_amount),
                None => value,
            }
        })
        .collect();
    Projection {
        reserve: pool.reserve.to_signed() + &delta,
        nav: pool.nav().to_signed() + delta,
        tranche_values,
    }
}

/// `(senior, junior)` value. Only the first tranche of a multi-tranche pool
/// is senior; everything subordinate to it counts as junior.
fn split_seniority(pool: &Pool, values: &[Amount]) -> (Amount, Amount) {
    let count = pool.tranches.len();
    let mut senior = Amount::zero();
    let mut junior = Amount::zero();
    for (tranche, value) in pool.tranches.iter().zip(values) {
        if tranche.tranche_type(count) == TrancheType::Senior {
            senior += value;
        } else {
            junior += value;
        }
    }
    (senior, junior)
}

/// Value that may leave `junior` while keeping `junior / (senior + junior) >= min`.
fn junior_redeem_headroom(senior: &Amount, junior: &Amount, min: Ratio) -> Amount {
    if min.is_zero() || senior.is_zero() {
        return junior.clone();
    }
    if min >= Ratio::ONE {
        return Amount::zero();
    }
    let rest = BigUint::from(RATIO_SCALE - min.raw());
    // ceil(senior * min / (1 - min))
    let scaled = senior.as_biguint() * BigUint::from(min.raw());
    let required = Amount::new((scaled + &rest - 1u32) / &rest);
    junior.saturating_sub(&required)
}

/// Value that may enter `senior` while keeping the junior share at `min`.
/// `None` means unbounded.
fn senior_invest_headroom(senior: &Amount, junior: &Amount, min: Ratio) -> Option<Amount> {
    if min.is_zero() {
        return None;
    }
    if min >= Ratio::ONE {
        return Some(Amount::zero());
    }
    let max_senior = junior.mul_div(
        &BigUint::from(RATIO_SCALE - min.raw()),
        &BigUint::from(min.raw()),
    );
    Some(max_senior.saturating_sub(senior))
}

/// Redemption cap for the tranche at `index` from the risk buffers of every
/// tranche senior to it. `None` means unbounded.
fn risk_buffer_redeem_cap(pool: &Pool, values: &[Amount], index: usize) -> Option<Amount> {
    pool.tranches[..index]
        .iter()
        .enumerate()
        .filter_map(|(above, tranche)| {
            let buffer = tranche.min_risk_buffer?;
            let below: Amount = values[above + 1..].iter().sum();
            Some(junior_redeem_headroom(&values[above], &below, buffer))
        })
        .min()
}

/// Investment cap for the tranche at `index` from its own risk buffer.
fn risk_buffer_invest_cap(pool: &Pool, values: &[Amount], index: usize) -> Option<Amount> {
    let buffer = pool.tranches[index].min_risk_buffer?;
    let below: Amount = values[index + 1..].iter().sum();
    senior_invest_headroom(&values[index], &below, buffer)
}

// ============================================================================
// Validation
// ============================================================================

/// Check a solution against the pool and its constraints.
///
/// Every broken constraint is reported; an empty violation list means the
/// solution is valid.
///
/// # Example
///
/// ```
/// use tranche_epoch::epoch::{validate_solution, SolutionConstraints};
/// use tranche_epoch::types::*;
///
/// let pool = Pool::new(
///     1,
///     CurrencyId::Native,
///     0,
///     Amount::from(1_000u64),
///     Amount::from(0u64),
///     vec![Tranche::new(0, 0, Amount::from(1_000u64), Amount::from(1u64))],
/// );
/// let constraints = SolutionConstraints::new(Amount::from(1_200u64), Ratio::ZERO, Ratio::ONE);
///
/// let mut allocation = TrancheAllocation::empty(0);
/// allocation.invest_amount = Amount::from(500u64);
/// let solution = EpochSolution {
///     pool_id: 1,
///     epoch_id: 1,
///     allocations: vec![allocation],
///     is_feasible: true,
///     score: Ratio::ONE,
///     violations: vec![],
///     fills: vec![],
/// };
///
/// let validation = validate_solution(&solution, &constraints, &pool);
/// assert!(!validation.is_valid);
/// assert_eq!(validation.messages(), vec!["Exceeds maximum reserve"]);
/// ```
pub fn validate_solution(
    solution: &EpochSolution,
    constraints: &SolutionConstraints,
    pool: &Pool,
) -> SolutionValidation {
    let projection = project(pool, solution);
    let mut violations = Vec::new();

    if projection.reserve.is_negative() {
        violations.push(Violation::InsufficientReserve {
            shortfall: Amount::new(projection.reserve.magnitude().clone()),
        });
    } else if projection.reserve > constraints.max_reserve.to_signed() {
        violations.push(Violation::ExceedsMaxReserve {
            projected_reserve: Amount::new(projection.reserve.magnitude().clone()),
            max_reserve: constraints.max_reserve.clone(),
        });
    }

    let (senior, junior) = split_seniority(pool, &projection.tranche_values);
    let total = &senior + &junior;
    if !total.is_zero() {
        let actual = valuation::subordination(&junior, &total);
        if actual < constraints.min_subordination_ratio {
            violations.push(Violation::BelowMinSubordination {
                actual,
                required: constraints.min_subordination_ratio,
            });
        }
    }

    for (index, tranche) in pool.tranches.iter().enumerate() {
        let Some(required) = tranche.min_risk_buffer else {
            continue;
        };
        let below: Amount = projection.tranche_values[index + 1..].iter().sum();
        let from_here = &below + &projection.tranche_values[index];
        if from_here.is_zero() {
            continue;
        }
        let actual = Ratio::of(&below, &from_here);
        if actual < required {
            violations.push(Violation::BelowMinRiskBuffer {
                tranche_id: tranche.id,
                actual,
                required,
            });
        }
    }

    let nav = pool.nav().to_signed();
    if nav.is_positive() && projection.nav < nav {
        let decrease = (&nav - &projection.nav).magnitude().clone();
        let allowed = constraints.max_nav_decrease;
        if &decrease * BigUint::from(RATIO_SCALE) > nav.magnitude() * BigUint::from(allowed.raw()) {
            violations.push(Violation::ExceedsMaxNavDecrease {
                actual: Ratio::from_fraction(&decrease, nav.magnitude()),
                allowed,
            });
        }
    }

    SolutionValidation::from_violations(violations)
}

// ============================================================================
// Solution computation
// ============================================================================

fn check_gate(pool: &Pool, epoch: &Epoch, timing: &EpochTiming, now: u64) -> Result<(), ClearingError> {
    if epoch.pool_id != pool.pool_id {
        return Err(ClearingError::InvalidPool(format!(
            "epoch {} belongs to pool {}, not {}",
            epoch.epoch_id, epoch.pool_id, pool.pool_id
        )));
    }
    match epoch.state {
        EpochState::Open if can_close_epoch(epoch, timing, now) => Ok(()),
        EpochState::Open => Err(ClearingError::EpochNotClosable {
            epoch_id: epoch.epoch_id,
            closable_at: closable_at(epoch, timing),
            now,
        }),
        EpochState::InSubmission => Ok(()),
        state => Err(ClearingError::InvalidTransition {
            from: state,
            to: EpochState::InSubmission,
            reason: "solutions can only be computed before execution".to_string(),
        }),
    }
}

/// Pro-rata fills for one tranche and direction. Returns the total filled.
fn allocate(
    orders: &[Order],
    tranche_id: TrancheId,
    order_type: OrderType,
    total: &Amount,
    available: &Amount,
    ratio: Ratio,
    fills: &mut Vec<OrderFill>,
) -> Amount {
    let mut allocated = Amount::zero();
    let class = orders
        .iter()
        .filter(|o| o.tranche_id == tranche_id && o.order_type == order_type && !o.is_cancelled());
    for order in class {
        let fulfilled = pro_rata_share(&order.amount, total, available);
        allocated += &fulfilled;
        fills.push(OrderFill {
            order_id: order.id,
            tranche_id,
            order_type,
            requested: order.amount.clone(),
            fulfilled,
            fulfillment_ratio: ratio,
        });
    }
    allocated
}

/// Compute the clearing solution for `epoch`.
///
/// The epoch must either be `Open` and past its minimum duration, or already
/// `InSubmission` (re-computation).
///
/// # Errors
///
/// * [`ClearingError::EpochNotClosable`] - the epoch gate has not been reached
/// * [`ClearingError::InvalidTransition`] - the epoch is executing or closed
/// * [`ClearingError::InvalidPool`] - malformed pool, or epoch of another pool
/// * [`ClearingError::InvalidConstraints`] - malformed constraints
/// * [`ClearingError::InvalidOrder`] - an order fails validation
pub fn compute_solution(
    pool: &Pool,
    epoch: &Epoch,
    orders: &[Order],
    constraints: &SolutionConstraints,
    timing: &EpochTiming,
    now: u64,
) -> Result<EpochSolution, ClearingError> {
    check_gate(pool, epoch, timing, now)?;
    pool.validate()?;
    constraints.validate()?;
    validate_orders(pool, epoch.epoch_id, orders)?;

    let decimals = pool.currency_decimals;
    let count = pool.tranches.len();
    let min_sub = constraints.min_subordination_ratio;
    let summaries = aggregate_by_tranche(pool, orders);
    let mut values = pool.tranche_values();
    let (mut senior_value, mut junior_value) = split_seniority(pool, &values);

    let mut allocations: Vec<TrancheAllocation> = pool
        .tranches
        .iter()
        .map(|t| TrancheAllocation::empty(t.id))
        .collect();
    let mut fills = Vec::with_capacity(orders.len());
    let mut demanded = Amount::zero();
    let mut fulfilled = Amount::zero();

    // Redemptions
    let nav_budget = constraints.max_nav_decrease.apply(&pool.nav());
    let mut redeem_budget = pool.reserve.clone().min(nav_budget);
    let mut total_redeemed = Amount::zero();

    for (index, tranche) in pool.tranches.iter().enumerate() {
        let demand_tokens = &summaries[index].redeem.total_amount;
        let demand = valuation::redeem_currency(demand_tokens, &tranche.token_price, decimals);
        let is_senior = tranche.tranche_type(count) == TrancheType::Senior;

        let mut cap = redeem_budget.clone();
        if !is_senior {
            cap = cap.min(junior_redeem_headroom(&senior_value, &junior_value, min_sub));
        }
        if let Some(limit) = risk_buffer_redeem_cap(pool, &values, index) {
            cap = cap.min(limit);
        }
        let available_tokens = if tranche.token_price.is_zero() {
            Amount::zero()
        } else if demand <= cap {
            demand_tokens.clone()
        } else {
            valuation::invest_tokens(&cap, &tranche.token_price, decimals).min(demand_tokens.clone())
        };

        let ratio = fulfillment_ratio(demand_tokens, &available_tokens);
        let redeem_tokens = allocate(
            orders,
            tranche.id,
            OrderType::Redeem,
            demand_tokens,
            &available_tokens,
            ratio,
            &mut fills,
        );
        let redeemed = valuation::redeem_currency(&redeem_tokens, &tranche.token_price, decimals);

        debug!(
            tranche_id = tranche.id,
            demand = %demand,
            cap = %cap,
            redeemed = %redeemed,
            ratio = %ratio,
            "redeem pass"
        );

        redeem_budget = redeem_budget.saturating_sub(&redeemed);
        values[index] = values[index].saturating_sub(&redeemed);
        if is_senior {
            senior_value = senior_value.saturating_sub(&redeemed);
        } else {
            junior_value = junior_value.saturating_sub(&redeemed);
        }
        demanded += &demand;
        fulfilled += &redeemed;
        total_redeemed += &redeemed;

        let allocation = &mut allocations[index];
        allocation.redeem_tokens = redeem_tokens;
        allocation.redeem_amount = redeemed;
        allocation.redeem_fulfillment_ratio = ratio;
    }

    // Investments
    let reserve_after_redeem = pool.reserve.saturating_sub(&total_redeemed);
    let mut invest_headroom = constraints.max_reserve.saturating_sub(&reserve_after_redeem);

    for (index, tranche) in pool.tranches.iter().enumerate() {
        let demand = &summaries[index].invest.total_amount;
        let is_senior = tranche.tranche_type(count) == TrancheType::Senior;

        let mut cap = if tranche.token_price.is_zero() {
            Amount::zero()
        } else {
            invest_headroom.clone()
        };
        if is_senior {
            if let Some(limit) = senior_invest_headroom(&senior_value, &junior_value, min_sub) {
                cap = cap.min(limit);
            }
        }
        if let Some(limit) = risk_buffer_invest_cap(pool, &values, index) {
            cap = cap.min(limit);
        }
        let available = demand.clone().min(cap);

        let ratio = fulfillment_ratio(demand, &available);
        let invested = allocate(
            orders,
            tranche.id,
            OrderType::Invest,
            demand,
            &available,
            ratio,
            &mut fills,
        );
        let minted = valuation::invest_tokens(&invested, &tranche.token_price, decimals);

        debug!(
            tranche_id = tranche.id,
            demand = %demand,
            invested = %invested,
            minted = %minted,
            ratio = %ratio,
            "invest pass"
        );

        invest_headroom = invest_headroom.saturating_sub(&invested);
        values[index] += &invested;
        if is_senior {
            senior_value += &invested;
        } else {
            junior_value += &invested;
        }
        demanded += demand;
        fulfilled += &invested;

        let allocation = &mut allocations[index];
        allocation.invest_amount = invested;
        allocation.invest_tokens = minted;
        allocation.invest_fulfillment_ratio = ratio;
    }

    fills.sort_by_key(|f| f.order_id);
    let score = if demanded.is_zero() {
        Ratio::ONE
    } else {
        Ratio::of(&fulfilled, &demanded)
    };

    let mut solution = EpochSolution {
        pool_id: pool.pool_id,
        epoch_id: epoch.epoch_id,
        allocations,
        is_feasible: false,
        score,
        violations: Vec::new(),
        fills,
    };
    let validation = validate_solution(&solution, constraints, pool);
    let messages = validation.messages();
    solution.is_feasible = validation.is_valid;
    solution.violations = validation.violations;

    if solution.is_feasible {
        info!(
            pool_id = pool.pool_id,
            epoch_id = epoch.epoch_id,
            invest = %solution.total_invest(),
            redeem = %solution.total_redeem(),
            score = %solution.score,
            "epoch solution computed"
        );
    } else {
        warn!(
            pool_id = pool.pool_id,
            epoch_id = epoch.epoch_id,
            violations = ?messages,
            "epoch solution infeasible"
        );
    }
    Ok(solution)
}

/// Compute a solution and attach it to `epoch`, moving an open epoch into
/// submission first.
pub fn submit_epoch(
    pool: &Pool,
    epoch: &Epoch,
    orders: &[Order],
    constraints: &SolutionConstraints,
    timing: &EpochTiming,
    now: u64,
) -> Result<Epoch, ClearingError> {
    let solution = compute_solution(pool, epoch, orders, constraints, timing, now)?;
    let submitted = match epoch.state {
        EpochState::Open => epoch.submit(timing, now)?,
        _ => epoch.clone(),
    };
    submitted.with_solution(solution, aggregate_by_tranche(pool, orders))
}

// ============================================================================
// Execution
// ============================================================================

/// Fill of every order in `orders` under `solution`.
///
/// Orders the solution does not cover (cancelled ones) get a zero fill.
pub fn order_fills(orders: &[Order], solution: &EpochSolution) -> Vec<OrderFill> {
    let by_id: HashMap<OrderId, &OrderFill> =
        solution.fills.iter().map(|f| (f.order_id, f)).collect();
    orders
        .iter()
        .map(|order| match by_id.get(&order.id) {
            Some(fill) => (*fill).clone(),
            None => OrderFill {
                order_id: order.id,
                tranche_id: order.tranche_id,
                order_type: order.order_type,
                requested: order.amount.clone(),
                fulfilled: Amount::zero(),
                fulfillment_ratio: Ratio::ZERO,
            },
        })
        .collect()
}

fn status_after(fill: &OrderFill) -> Option<OrderStatus> {
    if fill.fulfilled >= fill.requested {
        Some(OrderStatus::Fulfilled)
    } else if !fill.fulfilled.is_zero() {
        Some(OrderStatus::PartiallyFulfilled)
    } else {
        None
    }
}

/// New orders with statuses advanced by `fills`. Orders without a fill, or
/// whose status may not change, are returned unchanged.
pub fn apply_fills(orders: &[Order], fills: &[OrderFill]) -> Vec<Order> {
    let by_id: HashMap<OrderId, &OrderFill> = fills.iter().map(|f| (f.order_id, f)).collect();
    orders
        .iter()
        .map(|order| {
            match by_id.get(&order.id).and_then(|fill| status_after(fill)) {
                Some(next) if order.status.can_transition_to(next) => order.with_status(next),
                _ => order.clone(),
            }
        })
        .collect()
}

/// Pool snapshot after `solution` executes: reserve and token supplies move,
/// portfolio valuation does not.
pub fn project_pool(pool: &Pool, solution: &EpochSolution) -> Pool {
    let mut next = pool.clone();
    next.reserve = (&pool.reserve + &solution.total_invest()).saturating_sub(&solution.total_redeem());
    for tranche in next.tranches.iter_mut() {
        if let Some(a) = solution.allocation(tranche.id) {
            tranche.token_supply =
                (&tranche.token_supply + &a.invest_tokens).saturating_sub(&a.redeem_tokens);
        }
    }
    next
}
