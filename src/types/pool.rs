//! Pool and tranche snapshots.
//!
//! A [`Pool`] is an immutable snapshot supplied by a chain indexer. The engine
//! never mutates one; epoch execution produces a new snapshot through
//! [`project_pool`](crate::epoch::project_pool).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::decimal::MAX_DECIMALS;
use crate::error::ClearingError;
use crate::types::{Amount, CurrencyId, EpochId, PoolId, Ratio, TrancheId};
use crate::valuation;

// ============================================================================
// TrancheType
// ============================================================================

/// Position of a tranche in the capital structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrancheType {
    Senior,
    Mezzanine,
    Junior,
}

// ============================================================================
// Tranche
// ============================================================================

/// A risk-tiered slice of a pool.
///
/// `token_price` is the price of one whole token expressed in pool currency
/// base units. `interest_rate_per_sec` is RAY-scaled (10^27).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tranche {
    pub id: TrancheId,
    /// 0 is the most senior tranche.
    pub seniority: u32,
    pub token_supply: Amount,
    pub token_price: Amount,
    pub interest_rate_per_sec: Amount,
    /// Minimum share of value that must sit below this tranche.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_risk_buffer: Option<Ratio>,
}

impl Tranche {
    pub fn new(id: TrancheId, seniority: u32, token_supply: Amount, token_price: Amount) -> Self {
        Self {
            id,
            seniority,
            token_supply,
            token_price,
            interest_rate_per_sec: Amount::zero(),
            min_risk_buffer: None,
        }
    }

    pub fn with_interest_rate(mut self, rate_per_sec: Amount) -> Self {
        self.interest_rate_per_sec = rate_per_sec;
        self
    }

    pub fn with_min_risk_buffer(mut self, buffer: Ratio) -> Self {
        self.min_risk_buffer = Some(buffer);
        self
    }

    /// Classify this tranche within a pool of `tranche_count` tranches.
    ///
    /// The last tranche is always junior, so a single-tranche pool reports
    /// `Junior`: it absorbs first loss.
    pub fn tranche_type(&self, tranche_count: usize) -> TrancheType {
        let last = tranche_count.saturating_sub(1) as u32;
        if self.seniority >= last {
            TrancheType::Junior
        } else if self.seniority == 0 {
            TrancheType::Senior
        } else {
            TrancheType::Mezzanine
        }
    }

    /// Currency value of the outstanding supply.
    pub fn value(&self, decimals: u32) -> Amount {
        valuation::position_value(&self.token_supply, &self.token_price, decimals)
    }

    /// The tranche token as a currency.
    pub fn currency(&self, pool_id: PoolId) -> CurrencyId {
        CurrencyId::Tranche {
            pool_id,
            tranche_id: self.id,
        }
    }
}

// ============================================================================
// Pool
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub pool_id: PoolId,
    pub currency: CurrencyId,
    pub currency_decimals: u32,
    /// Liquid currency held by the pool.
    pub reserve: Amount,
    /// Value of non-liquid assets (loans).
    pub portfolio_valuation: Amount,
    #[serde(default)]
    pub total_debt: Amount,
    #[serde(default)]
    pub number_of_loans: u32,
    /// Ordered senior-first.
    pub tranches: Vec<Tranche>,
}

impl Pool {
    pub fn new(
        pool_id: PoolId,
        currency: CurrencyId,
        currency_decimals: u32,
        reserve: Amount,
        portfolio_valuation: Amount,
        tranches: Vec<Tranche>,
    ) -> Self {
        Self {
            pool_id,
            currency,
            currency_decimals,
            reserve,
            portfolio_valuation,
            total_debt: Amount::zero(),
            number_of_loans: 0,
            tranches,
        }
    }

    pub fn with_loans(mut self, total_debt: Amount, number_of_loans: u32) -> Self {
        self.total_debt = total_debt;
        self.number_of_loans = number_of_loans;
        self
    }

    /// `portfolio_valuation + reserve`.
    pub fn nav(&self) -> Amount {
        &self.portfolio_valuation + &self.reserve
    }

    pub fn reserve_ratio(&self) -> Ratio {
        valuation::reserve_ratio(&self.reserve, &self.nav())
    }

    pub fn tranche(&self, id: TrancheId) -> Option<&Tranche> {
        self.tranches.iter().find(|t| t.id == id)
    }

    pub fn tranche_index(&self, id: TrancheId) -> Option<usize> {
        self.tranches.iter().position(|t| t.id == id)
    }

    /// Currency value of every tranche, senior-first.
    pub fn tranche_values(&self) -> Vec<Amount> {
        self.tranches
            .iter()
            .map(|t| t.value(self.currency_decimals))
            .collect()
    }

    /// Structural checks on a snapshot received from a collaborator.
    ///
    /// Tranches must be non-empty, ordered by seniority `0..n`, and carry
    /// unique ids. The pool currency cannot be one of its own tranche tokens.
    pub fn validate(&self) -> Result<(), ClearingError> {
        if self.tranches.is_empty() {
            return Err(ClearingError::InvalidPool(format!(
                "pool {} has no tranches",
                self.pool_id
            )));
        }
        if self.currency_decimals > MAX_DECIMALS {
            return Err(ClearingError::InvalidPool(format!(
                "pool {} currency decimals {} exceed {}",
                self.pool_id, self.currency_decimals, MAX_DECIMALS
            )));
        }
        if self.currency.is_token_of(self.pool_id) {
            return Err(ClearingError::InvalidPool(format!(
                "pool {} cannot be denominated in its own tranche token",
                self.pool_id
            )));
        }
        let mut seen = HashSet::with_capacity(self.tranches.len());
        for (index, tranche) in self.tranches.iter().enumerate() {
            if tranche.seniority as usize != index {
                return Err(ClearingError::InvalidPool(format!(
                    "tranche {} has seniority {} at position {}",
                    tranche.id, tranche.seniority, index
                )));
            }
            if !seen.insert(tranche.id) {
                return Err(ClearingError::InvalidPool(format!(
                    "duplicate tranche id {}",
                    tranche.id
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// PoolStateSummary
// ============================================================================

/// Display-oriented pool state handed to UI and automation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStateSummary {
    pub pool_id: PoolId,
    pub nav: Amount,
    pub reserve: Amount,
    pub reserve_ratio: Ratio,
    pub total_debt: Amount,
    pub number_of_loans: u32,
    pub epoch_id: EpochId,
    pub is_epoch_open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tranche_pool() -> Pool {
        Pool::new(
            1,
            CurrencyId::ForeignAsset(1),
            6,
            Amount::from(100u64),
            Amount::from(900u64),
            vec![
                Tranche::new(10, 0, Amount::from(800_000_000u64), Amount::from(1_000_000u64)),
                Tranche::new(11, 1, Amount::from(200_000_000u64), Amount::from(1_000_000u64)),
            ],
        )
    }

    #[test]
    fn test_nav_and_reserve_ratio() {
        let pool = two_tranche_pool();
        assert_eq!(pool.nav(), Amount::from(1000u64));
        assert_eq!(pool.reserve_ratio().to_string(), "0.1");
    }

    #[test]
    fn test_tranche_types() {
        let t = |s| Tranche::new(0, s, Amount::zero(), Amount::zero());
        assert_eq!(t(0).tranche_type(3), TrancheType::Senior);
        assert_eq!(t(1).tranche_type(3), TrancheType::Mezzanine);
        assert_eq!(t(2).tranche_type(3), TrancheType::Junior);
        assert_eq!(t(0).tranche_type(1), TrancheType::Junior);
    }

    #[test]
    fn test_tranche_values() {
        let pool = two_tranche_pool();
        assert_eq!(
            pool.tranche_values(),
            vec![Amount::from(800_000_000u64), Amount::from(200_000_000u64)]
        );
    }

    #[test]
    fn test_validate_ok() {
        assert!(two_tranche_pool().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        let mut pool = two_tranche_pool();
        pool.tranches[1].seniority = 5;
        assert!(matches!(pool.validate(), Err(ClearingError::InvalidPool(_))));

        let mut pool = two_tranche_pool();
        pool.tranches[1].id = 10;
        assert!(pool.validate().is_err());

        let mut pool = two_tranche_pool();
        pool.tranches.clear();
        assert!(pool.validate().is_err());

        let mut pool = two_tranche_pool();
        pool.currency = CurrencyId::Tranche {
            pool_id: 1,
            tranche_id: 10,
        };
        assert!(pool.validate().is_err());
    }
}
