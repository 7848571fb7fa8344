//! Investor orders for one epoch.
//!
//! ## Units
//!
//! - `Invest` amounts are pool currency base units.
//! - `Redeem` amounts are tranche token base units.
//!
//! Orders reference their pool, tranche and epoch by id only. Once created,
//! only `status` changes, and only through
//! [`apply_fills`](crate::epoch::apply_fills), which returns new orders.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, EpochId, OrderId, TrancheId};

// ============================================================================
// OrderType / OrderStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderType {
    Invest,
    Redeem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    #[default]
    Pending,
    PartiallyFulfilled,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    /// Allowed status changes. Terminal states never change.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, PartiallyFulfilled)
                | (Pending, Fulfilled)
                | (Pending, Cancelled)
                | (PartiallyFulfilled, Fulfilled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }
}

// ============================================================================
// Order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub investor: String,
    pub order_type: OrderType,
    pub amount: Amount,
    pub tranche_id: TrancheId,
    pub epoch_id: EpochId,
    #[serde(default)]
    pub status: OrderStatus,
}

impl Order {
    /// Create a pending order.
    pub fn new(
        id: OrderId,
        investor: impl Into<String>,
        order_type: OrderType,
        tranche_id: TrancheId,
        epoch_id: EpochId,
        amount: Amount,
    ) -> Self {
        Self {
            id,
            investor: investor.into(),
            order_type,
            amount,
            tranche_id,
            epoch_id,
            status: OrderStatus::Pending,
        }
    }

    /// Copy of this order with a new status.
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }
}

// ============================================================================
// RawOrder
// ============================================================================

/// An order as delivered by an indexer: the amount is a human decimal string
/// (`"250.75"`), not yet scaled to base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub id: OrderId,
    pub investor: String,
    pub order_type: OrderType,
    pub tranche_id: TrancheId,
    pub epoch_id: EpochId,
    pub amount: String,
}
