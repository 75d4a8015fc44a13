// src/engine/config.rs

use serde::{Deserialize, Serialize};

use crate::engine::error::ConfigError;

pub const DEFAULT_MINIMUM_VOLUME_THRESHOLD: f64 = 100.0;
pub const DEFAULT_PNL_EPSILON: f64 = 1e-9;
pub const DEFAULT_FLAT_EPSILON: f64 = 1e-9;
pub const DEFAULT_CLOSE_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_RECENT_N: usize = 1000;

/// Thresholds shared by the aggregator and the win-rate calculator.
///
/// Missing keys fall back to the defaults when deserialized, so a partial
/// config such as `{"recent_n": 200}` is enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Round trips with less notional than this are dropped.
    pub minimum_volume_threshold: f64,
    /// `|pnl|` at or below this counts as a draw and is dropped.
    pub pnl_epsilon: f64,
    /// `|position_before|` below this means the account was flat.
    pub flat_epsilon: f64,
    /// Relative tolerance for "last fill closes the whole position".
    pub close_tolerance: f64,
    /// Win-rate window: most recent round trips considered.
    pub recent_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum_volume_threshold: DEFAULT_MINIMUM_VOLUME_THRESHOLD,
            pnl_epsilon:              DEFAULT_PNL_EPSILON,
            flat_epsilon:             DEFAULT_FLAT_EPSILON,
            close_tolerance:          DEFAULT_CLOSE_TOLERANCE,
            recent_n:                 DEFAULT_RECENT_N,
        }
    }
}

/// Finite and non-negative, otherwise a `ConfigError` naming `field`.
fn check_threshold(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() {
        Err(ConfigError::NonFinite { field, value })
    } else if value < 0.0 {
        Err(ConfigError::Negative { field, value })
    } else {
        Ok(value)
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("minimum_volume_threshold", self.minimum_volume_threshold)?;
        check_threshold("pnl_epsilon",              self.pnl_epsilon)?;
        check_threshold("flat_epsilon",             self.flat_epsilon)?;
        check_threshold("close_tolerance",          self.close_tolerance)?;
        Ok(())
    }

    pub fn with_minimum_volume_threshold(mut self, value: f64) -> Result<Self, ConfigError> {
        self.minimum_volume_threshold = check_threshold("minimum_volume_threshold", value)?;
        Ok(self)
    }

    pub fn with_pnl_epsilon(mut self, value: f64) -> Result<Self, ConfigError> {
        self.pnl_epsilon = check_threshold("pnl_epsilon", value)?;
        Ok(self)
    }

    pub fn with_flat_epsilon(mut self, value: f64) -> Result<Self, ConfigError> {
        self.flat_epsilon = check_threshold("flat_epsilon", value)?;
        Ok(self)
    }

    pub fn with_close_tolerance(mut self, value: f64) -> Result<Self, ConfigError> {
        self.close_tolerance = check_threshold("close_tolerance", value)?;
        Ok(self)
    }

    pub fn with_recent_n(mut self, recent_n: usize) -> Self {
        self.recent_n = recent_n;
        self
    }
}
