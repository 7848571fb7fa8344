//! Core data types for the epoch engine.
//!
//! All amounts are integer base units ([`Amount`]); all fractions are
//! basis-point fixed point ([`Ratio`]). Nothing in this module uses floating
//! point.
//!
//! ## Types
//!
//! - [`Amount`], [`Ratio`]: numeric primitives
//! - [`CurrencyId`]: native / tranche / foreign currency
//! - [`Pool`], [`Tranche`], [`PoolStateSummary`]: pool snapshots
//! - [`Order`], [`RawOrder`]: investor orders
//! - [`Epoch`], [`OrderSummary`], [`TrancheOrders`]: epoch data
//! - [`EpochSolution`], [`TrancheAllocation`], [`Violation`]: clearing output

pub mod amount;
mod currency;
mod epoch;
mod order;
mod pool;
pub mod ratio;
mod solution;

pub use amount::Amount;
pub use currency::CurrencyId;
pub use epoch::{Epoch, EpochState, EpochTiming, OrderSummary, TrancheOrders};
pub use order::{Order, OrderStatus, OrderType, RawOrder};
pub use pool::{Pool, PoolStateSummary, Tranche, TrancheType};
pub use ratio::{Ratio, RATIO_SCALE};
pub use solution::{
    EpochSolution, OrderFill, SolutionValidation, TrancheAllocation, Violation,
};

pub type PoolId = u64;
pub type TrancheId = u64;
pub type EpochId = u64;
pub type OrderId = u64;
