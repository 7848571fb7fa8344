//! # Tranche Epoch
//!
//! Epoch clearing engine for tranched real-world-asset pools.
//!
//! Investors submit invest and redeem orders against the tranches of a pool
//! during an epoch. When the epoch closes, this crate decides how much of
//! each tranche's demand can be executed without breaking the pool's
//! constraints, and splits that amount pro rata across the orders.
//!
//! ## Architecture
//!
//! - **Decimal**: lossless conversion between human decimals and base units
//! - **Types**: amounts, ratios, pools, orders, epochs and solutions
//! - **Valuation**: NAV, reserve ratio, subordination, token prices, returns
//! - **Rates**: per-second RAY rates <-> APR
//! - **Epoch**: order aggregation, lifecycle state machine, clearing
//! - **Config**: environment-driven engine settings
//!
//! ## Design Principles
//!
//! 1. **No Floating Point**: every amount is an arbitrary-precision integer
//!    in base units; every fraction is basis-point fixed point
//! 2. **Determinism**: identical snapshots produce identical solutions and
//!    digests, independent of order arrival
//! 3. **Immutable Snapshots**: pools, orders and epochs are never mutated;
//!    transitions return new values
//! 4. **Explicit Time**: the current time is always a parameter

// ============================================================================
// Module declarations
// ============================================================================

/// Environment configuration
pub mod config;

/// Decimal string <-> base unit conversion
pub mod decimal;

/// Order aggregation, epoch lifecycle and clearing
pub mod epoch;

/// Error types
pub mod error;

/// Interest rate conversion
pub mod rates;

/// Core data types
pub mod types;

/// Pool valuation
pub mod valuation;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{ConfigError, EngineConfig};
pub use epoch::{compute_solution, validate_solution, SolutionConstraints};
pub use error::{ClearingError, DecimalError};
pub use types::{Amount, Epoch, EpochSolution, Order, Pool, Ratio, Tranche};
