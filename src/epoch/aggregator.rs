//! Order aggregation and pro-rata primitives.
//!
//! ## Fairness
//!
//! When a tranche's demand in one direction exceeds what can be filled, every
//! order in that tranche and direction is filled with the same ratio via
//! [`pro_rata_share`]. Arrival order never matters.

use std::collections::HashSet;

use num_bigint::BigUint;
use tracing::debug;

use crate::decimal;
use crate::error::ClearingError;
use crate::types::{
    Amount, EpochId, Order, OrderStatus, OrderSummary, OrderType, Pool, Ratio, RawOrder,
    TrancheOrders,
};

/// Sum, count and fulfilled share of a set of orders.
///
/// Amounts are summed as integers. `fulfillment_ratio` is
/// `fulfilled_count / order_count`, or zero for an empty set.
pub fn aggregate<'a, I>(orders: I) -> OrderSummary
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut summary = OrderSummary::default();
    for order in orders {
        summary.total_amount += &order.amount;
        summary.order_count += 1;
        if order.status == OrderStatus::Fulfilled {
            summary.fulfilled_count += 1;
        }
    }
    summary.fulfillment_ratio = Ratio::from_fraction(
        &BigUint::from(summary.fulfilled_count),
        &BigUint::from(summary.order_count),
    );
    summary
}

/// Per-tranche invest and redeem summaries, senior-first.
///
/// Cancelled orders are excluded. Orders for tranches not in `pool` are
/// ignored here; use [`validate_orders`] first to reject them.
pub fn aggregate_by_tranche(pool: &Pool, orders: &[Order]) -> Vec<TrancheOrders> {
    pool.tranches
        .iter()
        .map(|tranche| {
            let active = || {
                orders
                    .iter()
                    .filter(move |o| o.tranche_id == tranche.id && !o.is_cancelled())
            };
            TrancheOrders {
                tranche_id: tranche.id,
                invest: aggregate(active().filter(|o| o.order_type == OrderType::Invest)),
                redeem: aggregate(active().filter(|o| o.order_type == OrderType::Redeem)),
            }
        })
        .collect()
}

/// Share of `total_orders` that `available_liquidity` can fill.
///
/// Returns [`Ratio::ONE`] when there is nothing to fill or liquidity covers
/// everything; otherwise a basis-point ratio strictly below one.
pub fn fulfillment_ratio(total_orders: &Amount, available_liquidity: &Amount) -> Ratio {
    if total_orders.is_zero() || available_liquidity >= total_orders {
        return Ratio::ONE;
    }
    Ratio::of(available_liquidity, total_orders)
}

/// `order_amount * available_amount / total_orders`, truncating; zero when
/// `total_orders` is zero.
pub fn pro_rata_share(order_amount: &Amount, total_orders: &Amount, available_amount: &Amount) -> Amount {
    order_amount.mul_div(available_amount.as_biguint(), total_orders.as_biguint())
}

// ============================================================================
// Input validation
// ============================================================================

/// Reject orders that reference another epoch or an unknown tranche, that
/// were already executed, or that repeat an order id.
pub fn validate_orders(pool: &Pool, epoch_id: EpochId, orders: &[Order]) -> Result<(), ClearingError> {
    let mut seen = HashSet::with_capacity(orders.len());
    for order in orders {
        if !seen.insert(order.id) {
            return Err(ClearingError::InvalidOrder(format!("duplicate order id {}", order.id)));
        }
        if order.epoch_id != epoch_id {
            return Err(ClearingError::InvalidOrder(format!(
                "order {} belongs to epoch {}, not {}",
                order.id, order.epoch_id, epoch_id
            )));
        }
        if pool.tranche(order.tranche_id).is_none() {
            return Err(ClearingError::InvalidOrder(format!(
                "order {} references unknown tranche {}",
                order.id, order.tranche_id
            )));
        }
        if matches!(order.status, OrderStatus::Fulfilled | OrderStatus::PartiallyFulfilled) {
            return Err(ClearingError::InvalidOrder(format!(
                "order {} was already executed ({:?})",
                order.id, order.status
            )));
        }
    }
    Ok(())
}

/// Convert indexer orders to base units at the pool's precision.
///
/// Fails fast on the first malformed or negative amount, unknown tranche, or
/// wrong epoch.
pub fn normalize_orders(pool: &Pool, epoch_id: EpochId, raw: &[RawOrder]) -> Result<Vec<Order>, ClearingError> {
    let orders = raw
        .iter()
        .map(|r| {
            let amount = decimal::to_base_units(&r.amount, pool.currency_decimals).map_err(|e| {
                ClearingError::InvalidOrder(format!("order {}: {e}", r.id))
            })?;
            Ok(Order::new(
                r.id,
                r.investor.clone(),
                r.order_type,
                r.tranche_id,
                r.epoch_id,
                amount,
            ))
        })
        .collect::<Result<Vec<_>, ClearingError>>()?;

    validate_orders(pool, epoch_id, &orders)?;
    debug!(pool_id = pool.pool_id, epoch_id, count = orders.len(), "normalized orders");
    Ok(orders)
}
