//! Error taxonomy.
//!
//! Malformed input is always an error. Constraint violations on a computed
//! solution are *not* errors: they are reported as data inside
//! [`SolutionValidation`](crate::types::SolutionValidation) so callers can
//! resubmit orders or widen constraints.

use thiserror::Error;

use crate::types::EpochState;

/// Failures of the decimal engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("invalid amount format: {0}")]
    InvalidAmountFormat(String),
    #[error("invalid precision: {0}")]
    InvalidPrecision(String),
}

/// Failures of the aggregation and clearing layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClearingError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),
    #[error("invalid pool: {0}")]
    InvalidPool(String),
    #[error("epoch {epoch_id} cannot close before {closable_at} (now {now})")]
    EpochNotClosable {
        epoch_id: u64,
        closable_at: u64,
        now: u64,
    },
    #[error("invalid epoch transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: EpochState,
        to: EpochState,
        reason: String,
    },
    #[error(transparent)]
    Decimal(#[from] DecimalError),
}
