// src/engine/error.rs

use thiserror::Error;

/// Rejected `EngineConfig` values. Fill data never produces these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("'{field}' must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("'{field}' must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}
