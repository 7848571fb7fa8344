//! Epoch state and per-tranche order summaries.
//!
//! Transition logic lives in [`crate::epoch::lifecycle`]; this module only
//! holds the data.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, EpochId, EpochSolution, PoolId, Ratio, TrancheId};

/// Epoch lifecycle: `Open -> InSubmission -> InExecution -> Closed`, after
/// which the next epoch opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EpochState {
    Open,
    InSubmission,
    InExecution,
    Closed,
}

/// Timing parameters, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochTiming {
    pub min_epoch_duration: u64,
    pub challenge_period: u64,
}

impl Default for EpochTiming {
    fn default() -> Self {
        Self {
            min_epoch_duration: 24 * 60 * 60,
            challenge_period: 30 * 60,
        }
    }
}

/// Aggregate of one set of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub total_amount: Amount,
    pub order_count: u64,
    pub fulfilled_count: u64,
    /// `fulfilled_count / order_count`, zero for an empty set.
    pub fulfillment_ratio: Ratio,
}

/// Invest and redeem summaries for a single tranche.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrancheOrders {
    pub tranche_id: TrancheId,
    /// Currency base units.
    pub invest: OrderSummary,
    /// Tranche token base units.
    pub redeem: OrderSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub pool_id: PoolId,
    pub epoch_id: EpochId,
    pub state: EpochState,
    /// Unix seconds.
    pub started_at: u64,
    #[serde(default)]
    pub submitted_at: Option<u64>,
    #[serde(default)]
    pub summaries: Vec<TrancheOrders>,
    #[serde(default)]
    pub solution: Option<EpochSolution>,
}

impl Epoch {
    /// A freshly opened epoch.
    pub fn open(pool_id: PoolId, epoch_id: EpochId, started_at: u64) -> Self {
        Self {
            pool_id,
            epoch_id,
            state: EpochState::Open,
            started_at,
            submitted_at: None,
            summaries: Vec::new(),
            solution: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == EpochState::Open
    }
}
