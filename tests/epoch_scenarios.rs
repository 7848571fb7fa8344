//! End-to-end scenarios for the epoch engine.
//!
//! Covers the decimal and valuation reference values, reserve limits on a
//! hand-built solution, APR round trips, and a full epoch cycle from raw
//! indexer orders to the next open epoch.

use num_bigint::BigUint;

use tranche_epoch::decimal::{from_base_units, to_base_units};
use tranche_epoch::epoch::{
    apply_fills, compute_solution, fulfillment_ratio, normalize_orders, order_fills,
    pro_rata_share, project_pool, submit_epoch, validate_solution, SolutionConstraints,
};
use tranche_epoch::rates::{apr_to_per_sec_rate, per_sec_rate_to_apr};
use tranche_epoch::types::*;
use tranche_epoch::valuation::reserve_ratio;

// ============================================================================
// HELPERS
// ============================================================================

const DAY: u64 = 86_400;

fn amt(v: u64) -> Amount {
    Amount::from(v)
}

fn solution_with(allocations: Vec<TrancheAllocation>) -> EpochSolution {
    EpochSolution {
        pool_id: 1,
        epoch_id: 1,
        allocations,
        is_feasible: true,
        score: Ratio::ONE,
        violations: vec![],
        fills: vec![],
    }
}

/// Reserve 1000, no portfolio, senior 800 / junior 200 at price 1 (0 decimals).
fn reserve_pool() -> Pool {
    Pool::new(
        1,
        CurrencyId::Native,
        0,
        amt(1_000),
        amt(0),
        vec![
            Tranche::new(0, 0, amt(800), amt(1)),
            Tranche::new(1, 1, amt(200), amt(1)),
        ],
    )
}

// ============================================================================
// REFERENCE VALUES
// ============================================================================

#[test]
fn test_base_unit_reference_values() {
    let expected = BigUint::parse_bytes(b"100500000000000000000", 10).unwrap();
    let units = to_base_units("100.5", 18).unwrap();
    assert_eq!(units.as_biguint(), &expected);
    assert_eq!(from_base_units(&Amount::new(expected), 18), "100.5");
}

#[test]
fn test_reserve_ratio_reference_values() {
    assert_eq!(reserve_ratio(&amt(100), &amt(1_000)).to_string(), "0.1");
    assert_eq!(reserve_ratio(&amt(100), &amt(0)), Ratio::ZERO);
}

#[test]
fn test_max_reserve_boundary() {
    let pool = reserve_pool();
    let constraints = SolutionConstraints::new(amt(1_200), Ratio::ZERO, Ratio::ONE);

    let mut over = TrancheAllocation::empty(0);
    over.invest_amount = amt(500);
    let validation = validate_solution(&solution_with(vec![over]), &constraints, &pool);
    assert!(!validation.is_valid);
    assert_eq!(validation.messages(), vec!["Exceeds maximum reserve"]);

    let mut exact = TrancheAllocation::empty(0);
    exact.invest_amount = amt(200);
    let validation = validate_solution(&solution_with(vec![exact]), &constraints, &pool);
    assert!(validation.is_valid, "{:?}", validation.violations);
}

#[test]
fn test_apr_round_trip() {
    let rate = apr_to_per_sec_rate("5").unwrap();
    assert_eq!(per_sec_rate_to_apr(&rate).to_string(), "5.00");
}

#[test]
fn test_boundaries() {
    assert_eq!(fulfillment_ratio(&amt(0), &amt(12_345)), Ratio::ONE);
    assert_eq!(pro_rata_share(&amt(77), &amt(0), &amt(100)), Amount::zero());
}

// ============================================================================
// CONSERVATION
// ============================================================================

#[test]
fn test_overdrawn_reserve_is_never_valid() {
    let pool = reserve_pool();
    let constraints = SolutionConstraints::new(amt(u64::MAX), Ratio::ZERO, Ratio::ONE);
    for redeem in [1_001u64, 5_000, 1_000_000] {
        let mut a = TrancheAllocation::empty(0);
        a.redeem_amount = amt(redeem);
        let validation = validate_solution(&solution_with(vec![a]), &constraints, &pool);
        assert!(!validation.is_valid);
        assert!(validation
            .violations
            .iter()
            .any(|v| matches!(v, Violation::InsufficientReserve { .. })));
    }
}

#[test]
fn test_computed_solution_never_overdraws() {
    let pool = reserve_pool();
    let constraints = SolutionConstraints::new(amt(5_000), Ratio::ZERO, Ratio::ONE);
    let orders = vec![
        Order::new(1, "a", OrderType::Redeem, 0, 1, amt(700)),
        Order::new(2, "b", OrderType::Redeem, 1, 1, amt(200)),
        Order::new(3, "c", OrderType::Redeem, 0, 1, amt(100)),
    ];
    let epoch = Epoch::open(1, 1, 0);
    let solution =
        compute_solution(&pool, &epoch, &orders, &constraints, &EpochTiming::default(), DAY)
            .unwrap();

    assert!(solution.total_redeem() <= pool.reserve);
    assert!(solution.is_feasible);
    // senior takes the whole reserve first
    assert_eq!(solution.allocation(0).unwrap().redeem_amount, amt(800));
    assert_eq!(solution.allocation(1).unwrap().redeem_amount, amt(200));
}

// ============================================================================
// FULL CYCLE
// ============================================================================

#[test]
fn test_full_epoch_cycle_from_raw_orders() {
    let pool = Pool::new(
        7,
        CurrencyId::ForeignAsset(2),
        6,
        to_base_units("100", 6).unwrap(),
        to_base_units("900", 6).unwrap(),
        vec![
            Tranche::new(0, 0, to_base_units("800", 6).unwrap(), to_base_units("1", 6).unwrap()),
            Tranche::new(1, 1, to_base_units("200", 6).unwrap(), to_base_units("1", 6).unwrap()),
        ],
    );
    let constraints = SolutionConstraints::parse("150", "0.1", "1", 6).unwrap();
    let timing = EpochTiming::default();

    let raw = vec![
        RawOrder {
            id: 10,
            investor: "alice".into(),
            order_type: OrderType::Invest,
            tranche_id: 0,
            epoch_id: 4,
            amount: "60".into(),
        },
        RawOrder {
            id: 11,
            investor: "bob".into(),
            order_type: OrderType::Invest,
            tranche_id: 0,
            epoch_id: 4,
            amount: "40".into(),
        },
    ];
    let orders = normalize_orders(&pool, 4, &raw).unwrap();

    let epoch = Epoch::open(7, 4, 1_000);
    let epoch = submit_epoch(&pool, &epoch, &orders, &constraints, &timing, 1_000 + DAY).unwrap();
    let solution = epoch.solution.clone().unwrap();
    assert!(solution.is_feasible);
    assert_eq!(solution.total_invest(), to_base_units("50", 6).unwrap());

    let executed = epoch
        .execute(&timing, 1_000 + DAY + timing.challenge_period)
        .unwrap();
    let closed = executed.close().unwrap();
    let next = closed.next(1_000 + 2 * DAY).unwrap();
    assert_eq!(next.epoch_id, 5);
    assert!(next.is_open());

    let updated = apply_fills(&orders, &order_fills(&orders, &solution));
    assert!(updated
        .iter()
        .all(|o| o.status == OrderStatus::PartiallyFulfilled));

    let projected = project_pool(&pool, &solution);
    assert_eq!(from_base_units(&projected.reserve, 6), "150");
    assert_eq!(from_base_units(&projected.tranches[0].token_supply, 6), "850");
}

#[test]
fn test_solution_json_shape() {
    let pool = reserve_pool();
    let constraints = SolutionConstraints::new(amt(1_100), Ratio::ZERO, Ratio::ONE);
    let orders = vec![Order::new(1, "a", OrderType::Invest, 1, 1, amt(300))];
    let solution = compute_solution(
        &pool,
        &Epoch::open(1, 1, 0),
        &orders,
        &constraints,
        &EpochTiming::default(),
        DAY,
    )
    .unwrap();

    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["allocations"][1]["investAmount"], "100");
    assert_eq!(json["allocations"][1]["investFulfillmentRatio"], "0.3333");
    assert_eq!(json["isFeasible"], true);

    let back: EpochSolution = serde_json::from_value(json).unwrap();
    assert_eq!(back, solution);
}
