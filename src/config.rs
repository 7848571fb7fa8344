use std::collections::HashMap;

use thiserror::Error;

use crate::decimal;
use crate::epoch::SolutionConstraints;
use crate::error::ClearingError;
use crate::types::{EpochTiming, Ratio};

/// Engine settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub min_epoch_duration_secs: u64,
    pub challenge_period_secs: u64,
    /// Human decimal, scaled once the pool currency is known.
    pub max_reserve: String,
    pub min_subordination: Ratio,
    pub max_nav_decrease: Ratio,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for EngineConfig {
    fn default() -> Self {
        let timing = EpochTiming::default();
        Self {
            min_epoch_duration_secs: timing.min_epoch_duration,
            challenge_period_secs: timing.challenge_period,
            max_reserve: "1000000".to_string(),
            min_subordination: Ratio::ZERO,
            max_nav_decrease: Ratio::ONE,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let min_epoch_duration_secs = parse_secs(
            &env_map,
            "EPOCH_MIN_DURATION_SECS",
            defaults.min_epoch_duration_secs,
        )?;
        let challenge_period_secs = parse_secs(
            &env_map,
            "EPOCH_CHALLENGE_PERIOD_SECS",
            defaults.challenge_period_secs,
        )?;

        let max_reserve = env_map
            .get("POOL_MAX_RESERVE")
            .cloned()
            .unwrap_or(defaults.max_reserve);
        decimal::to_base_units(&max_reserve, 0).map_err(|e| {
            ConfigError::InvalidValue("POOL_MAX_RESERVE".to_string(), e.to_string())
        })?;

        let min_subordination =
            parse_ratio(&env_map, "POOL_MIN_SUBORDINATION", defaults.min_subordination)?;
        let max_nav_decrease =
            parse_ratio(&env_map, "POOL_MAX_NAV_DECREASE", defaults.max_nav_decrease)?;

        Ok(EngineConfig {
            min_epoch_duration_secs,
            challenge_period_secs,
            max_reserve,
            min_subordination,
            max_nav_decrease,
        })
    }

    pub fn timing(&self) -> EpochTiming {
        EpochTiming {
            min_epoch_duration: self.min_epoch_duration_secs,
            challenge_period: self.challenge_period_secs,
        }
    }

    /// Constraints for a pool whose currency has `decimals` places.
    pub fn solution_constraints(&self, decimals: u32) -> Result<SolutionConstraints, ClearingError> {
        let max_reserve = decimal::to_base_units(&self.max_reserve, decimals)
            .map_err(|e| ClearingError::InvalidConstraints(format!("maxReserve: {e}")))?;
        let constraints =
            SolutionConstraints::new(max_reserve, self.min_subordination, self.max_nav_decrease);
        constraints.validate()?;
        Ok(constraints)
    }
}

fn parse_secs(env_map: &HashMap<String, String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    match env_map.get(key) {
        Some(value) => value.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
        }),
        None => Ok(default),
    }
}

fn parse_ratio(env_map: &HashMap<String, String>, key: &str, default: Ratio) -> Result<Ratio, ConfigError> {
    let Some(value) = env_map.get(key) else {
        return Ok(default);
    };
    let ratio = value
        .parse::<Ratio>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))?;
    if !ratio.is_unit_interval() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between 0 and 1, got {}", value),
        ));
    }
    Ok(ratio)
}
