//! Epoch engine: order aggregation, lifecycle and clearing.
//!
//! ## Flow
//!
//! 1. Orders arrive from an indexer as [`RawOrder`](crate::types::RawOrder)s
//!    and are scaled to base units by [`normalize_orders`].
//! 2. Once the minimum epoch duration has passed, [`compute_solution`]
//!    clears them against the pool constraints.
//! 3. The solution is attached to the epoch ([`submit_epoch`]), executed
//!    after the challenge period, and applied with [`apply_fills`] and
//!    [`project_pool`].
//!
//! ## Example
//!
//! ```
//! use tranche_epoch::epoch::{compute_solution, SolutionConstraints};
//! use tranche_epoch::types::*;
//!
//! let pool = Pool::new(
//!     1,
//!     CurrencyId::ForeignAsset(1),
//!     6,
//!     Amount::from(100_000_000u64),
//!     Amount::from(900_000_000u64),
//!     vec![
//!         Tranche::new(0, 0, Amount::from(800_000_000u64), Amount::from(1_000_000u64)),
//!         Tranche::new(1, 1, Amount::from(200_000_000u64), Amount::from(1_000_000u64)),
//!     ],
//! );
//! let constraints = SolutionConstraints::parse("150", "0.1", "1", 6).unwrap();
//! let epoch = Epoch::open(1, 1, 0);
//! let orders = vec![
//!     Order::new(1, "alice", OrderType::Invest, 0, 1, Amount::from(60_000_000u64)),
//!     Order::new(2, "bob", OrderType::Invest, 0, 1, Amount::from(40_000_000u64)),
//! ];
//!
//! let timing = EpochTiming::default();
//! let solution = compute_solution(&pool, &epoch, &orders, &constraints, &timing, 86_400).unwrap();
//!
//! // 50 units of headroom for 100 units of demand: everyone gets half
//! assert_eq!(solution.allocations[0].invest_fulfillment_ratio.to_string(), "0.5");
//! assert!(solution.is_feasible);
//! ```

pub mod aggregator;
pub mod clearing;
pub mod lifecycle;

pub use aggregator::{
    aggregate, aggregate_by_tranche, fulfillment_ratio, normalize_orders, pro_rata_share,
    validate_orders,
};
pub use clearing::{
    apply_fills, compute_solution, order_fills, project_pool, submit_epoch, validate_solution,
    SolutionConstraints,
};
pub use lifecycle::{can_close_epoch, closable_at};
