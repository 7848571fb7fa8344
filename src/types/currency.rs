//! Currency identifiers.
//!
//! A pool's reserve currency and each tranche token are distinct currencies.
//! Collaborators describe them as JSON objects distinguished by which key is
//! present; here they form a closed enum that is always matched exhaustively.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PoolId, TrancheId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurrencyId {
    /// The chain's native token.
    Native,
    /// A tranche token issued by a pool.
    #[serde(rename_all = "camelCase")]
    Tranche {
        pool_id: PoolId,
        tranche_id: TrancheId,
    },
    /// A registered foreign asset (stablecoin etc.) by registry index.
    ForeignAsset(u32),
}

impl CurrencyId {
    /// True when this currency is a token of `pool_id` itself.
    pub fn is_token_of(&self, pool_id: PoolId) -> bool {
        match self {
            CurrencyId::Tranche { pool_id: p, .. } => *p == pool_id,
            CurrencyId::Native | CurrencyId::ForeignAsset(_) => false,
        }
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyId::Native => write!(f, "native"),
            CurrencyId::Tranche {
                pool_id,
                tranche_id,
            } => write!(f, "tranche:{pool_id}:{tranche_id}"),
            CurrencyId::ForeignAsset(index) => write!(f, "foreign:{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CurrencyId::Native.to_string(), "native");
        assert_eq!(CurrencyId::ForeignAsset(3).to_string(), "foreign:3");
        assert_eq!(
            CurrencyId::Tranche {
                pool_id: 7,
                tranche_id: 1
            }
            .to_string(),
            "tranche:7:1"
        );
    }

    #[test]
    fn test_is_token_of() {
        let token = CurrencyId::Tranche {
            pool_id: 7,
            tranche_id: 0,
        };
        assert!(token.is_token_of(7));
        assert!(!token.is_token_of(8));
        assert!(!CurrencyId::ForeignAsset(1).is_token_of(7));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&CurrencyId::ForeignAsset(1)).unwrap();
        assert_eq!(json, r#"{"foreignAsset":1}"#);
        let token: CurrencyId =
            serde_json::from_str(r#"{"tranche":{"poolId":2,"trancheId":5}}"#).unwrap();
        assert_eq!(
            token,
            CurrencyId::Tranche {
                pool_id: 2,
                tranche_id: 5
            }
        );
        let native: CurrencyId = serde_json::from_str(r#""native""#).unwrap();
        assert_eq!(native, CurrencyId::Native);
    }
}
