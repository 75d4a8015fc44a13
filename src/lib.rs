// src/lib.rs

pub mod engine;

pub use engine::{
    config::EngineConfig,
    equity::{cumulative_pnl_curve, max_drawdown},
    error::ConfigError,
    fill::{parse_fills, parse_fills_json, FillRecord, RawField},
    metrics::{calculate_win_rate, win_rate_from_round_trips, WinRateResult},
    round_trip::{aggregate_round_trips, aggregate_round_trips_default, RoundTrip},
};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

#[cfg(feature = "python")]
#[pymodule]
fn trade_stats(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(engine::py_aggregate_round_trips, m)?)?;
    m.add_function(wrap_pyfunction!(engine::py_calculate_win_rate, m)?)?;
    m.add_function(wrap_pyfunction!(engine::py_cumulative_pnl, m)?)?;
    m.add_function(wrap_pyfunction!(engine::py_max_drawdown, m)?)?;
    Ok(())
}
