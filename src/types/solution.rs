//! Epoch solutions and their validation results.
//!
//! ## Digest
//!
//! An [`EpochSolution`] can be fingerprinted with SHA-256 over a canonical
//! big-endian encoding of its allocations and fills. Two engines fed identical
//! snapshots must produce identical digests.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Amount, EpochId, OrderId, OrderType, PoolId, Ratio, TrancheId};

// ============================================================================
// TrancheAllocation
// ============================================================================

/// Realized invest/redeem flow for one tranche.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrancheAllocation {
    pub tranche_id: TrancheId,
    /// Currency accepted from investors.
    pub invest_amount: Amount,
    pub invest_fulfillment_ratio: Ratio,
    /// Tranche tokens minted for `invest_amount`.
    pub invest_tokens: Amount,
    /// Currency paid out to redeeming investors.
    pub redeem_amount: Amount,
    /// Tranche tokens burned for `redeem_amount`.
    pub redeem_tokens: Amount,
    pub redeem_fulfillment_ratio: Ratio,
}

impl TrancheAllocation {
    /// An allocation that moves nothing.
    pub fn empty(tranche_id: TrancheId) -> Self {
        Self {
            tranche_id,
            invest_amount: Amount::zero(),
            invest_fulfillment_ratio: Ratio::ONE,
            invest_tokens: Amount::zero(),
            redeem_amount: Amount::zero(),
            redeem_tokens: Amount::zero(),
            redeem_fulfillment_ratio: Ratio::ONE,
        }
    }
}

// ============================================================================
// Violations
// ============================================================================

/// A constraint broken by a solution. This is a result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    #[serde(rename_all = "camelCase")]
    ExceedsMaxReserve {
        projected_reserve: Amount,
        max_reserve: Amount,
    },
    #[serde(rename_all = "camelCase")]
    InsufficientReserve { shortfall: Amount },
    #[serde(rename_all = "camelCase")]
    BelowMinSubordination { actual: Ratio, required: Ratio },
    #[serde(rename_all = "camelCase")]
    BelowMinRiskBuffer {
        tranche_id: TrancheId,
        actual: Ratio,
        required: Ratio,
    },
    #[serde(rename_all = "camelCase")]
    ExceedsMaxNavDecrease { actual: Ratio, allowed: Ratio },
}

impl Violation {
    pub fn message(&self) -> &'static str {
        match self {
            Violation::ExceedsMaxReserve { .. } => "Exceeds maximum reserve",
            Violation::InsufficientReserve { .. } => "Insufficient reserve for redemptions",
            Violation::BelowMinSubordination { .. } => "Below minimum subordination ratio",
            Violation::BelowMinRiskBuffer { .. } => "Below minimum risk buffer",
            Violation::ExceedsMaxNavDecrease { .. } => "Exceeds maximum NAV decrease",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ExceedsMaxReserve {
                projected_reserve,
                max_reserve,
            } => write!(f, "{} ({projected_reserve} > {max_reserve})", self.message()),
            Violation::InsufficientReserve { shortfall } => {
                write!(f, "{} (short by {shortfall})", self.message())
            }
            Violation::BelowMinSubordination { actual, required } => {
                write!(f, "{} ({actual} < {required})", self.message())
            }
            Violation::BelowMinRiskBuffer {
                tranche_id,
                actual,
                required,
            } => write!(
                f,
                "{} for tranche {tranche_id} ({actual} < {required})",
                self.message()
            ),
            Violation::ExceedsMaxNavDecrease { actual, allowed } => {
                write!(f, "{} ({actual} > {allowed})", self.message())
            }
        }
    }
}

/// Outcome of checking a solution against constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionValidation {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

impl SolutionValidation {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
        }
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.violations.iter().map(Violation::message).collect()
    }
}

// ============================================================================
// EpochSolution
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSolution {
    pub pool_id: PoolId,
    pub epoch_id: EpochId,
    /// Senior-first, one entry per tranche.
    pub allocations: Vec<TrancheAllocation>,
    pub is_feasible: bool,
    /// Fulfilled share of total demand, in currency terms.
    pub score: Ratio,
    #[serde(default)]
    pub violations: Vec<Violation>,
    /// Per-order outcomes, sorted by order id.
    #[serde(default)]
    pub fills: Vec<OrderFill>,
}

impl EpochSolution {
    pub fn allocation(&self, tranche_id: TrancheId) -> Option<&TrancheAllocation> {
        self.allocations.iter().find(|a| a.tranche_id == tranche_id)
    }

    pub fn total_invest(&self) -> Amount {
        self.allocations.iter().map(|a| &a.invest_amount).sum()
    }

    pub fn fill(&self, order_id: OrderId) -> Option<&OrderFill> {
        self.fills.iter().find(|f| f.order_id == order_id)
    }

    pub fn total_redeem(&self) -> Amount {
        self.allocations.iter().map(|a| &a.redeem_amount).sum()
    }

    /// SHA-256 over the canonical encoding of this solution.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.pool_id.to_be_bytes());
        hasher.update(self.epoch_id.to_be_bytes());
        hasher.update((self.allocations.len() as u64).to_be_bytes());
        for a in &self.allocations {
            hasher.update(a.tranche_id.to_be_bytes());
            for amount in [
                &a.invest_amount,
                &a.invest_tokens,
                &a.redeem_amount,
                &a.redeem_tokens,
            ] {
                let bytes = amount.to_bytes_be();
                hasher.update((bytes.len() as u32).to_be_bytes());
                hasher.update(&bytes);
            }
            hasher.update(a.invest_fulfillment_ratio.raw().to_be_bytes());
            hasher.update(a.redeem_fulfillment_ratio.raw().to_be_bytes());
        }
        hasher.update([u8::from(self.is_feasible)]);
        hasher.update(self.score.raw().to_be_bytes());
        hasher.update((self.fills.len() as u64).to_be_bytes());
        for fill in &self.fills {
            hasher.update(fill.order_id.to_be_bytes());
            let bytes = fill.fulfilled.to_bytes_be();
            hasher.update((bytes.len() as u32).to_be_bytes());
            hasher.update(&bytes);
        }

        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

// ============================================================================
// OrderFill
// ============================================================================

/// Realized outcome of a single order.
///
/// `fulfillment_ratio` is the class ratio shared by every order of the same
/// tranche and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFill {
    pub order_id: OrderId,
    pub tranche_id: TrancheId,
    pub order_type: OrderType,
    pub requested: Amount,
    pub fulfilled: Amount,
    pub fulfillment_ratio: Ratio,
}
