// src/engine/mod.rs

pub mod config;
pub mod error;
pub mod fill;
pub mod round_trip;
pub mod metrics;
pub mod equity;

#[cfg(feature = "python")]
pub use bindings::{py_aggregate_round_trips, py_calculate_win_rate, py_cumulative_pnl, py_max_drawdown};

#[cfg(feature = "python")]
mod bindings {
    use std::borrow::Cow;

    use numpy::{IntoPyArray, PyArray1};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyLong, PyString};

    use crate::engine::{
        config::{EngineConfig, DEFAULT_MINIMUM_VOLUME_THRESHOLD, DEFAULT_PNL_EPSILON, DEFAULT_RECENT_N},
        equity::{cumulative_pnl_curve, max_drawdown},
        error::ConfigError,
        fill::{FillRecord, RawField},
        metrics::calculate_win_rate,
        round_trip::aggregate_round_trips,
    };

    impl From<ConfigError> for PyErr {
        fn from(err: ConfigError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    /// First present key wins; bools, None and containers are absent.
    fn py_field<'a>(dict: &'a PyDict, keys: &[&str]) -> RawField<'a> {
        let value = match keys.iter().find_map(|k| dict.get_item(*k)) {
            Some(v) => v,
            None    => return RawField::Absent,
        };

        if value.downcast::<PyBool>().is_ok() {
            RawField::Absent
        } else if value.downcast::<PyLong>().is_ok() {
            match value.extract::<i64>() {
                Ok(i)  => RawField::Int(i),
                Err(_) => value.extract::<f64>().map_or(RawField::Absent, RawField::Float),
            }
        } else if let Ok(f) = value.downcast::<PyFloat>() {
            RawField::Float(f.value())
        } else if let Ok(s) = value.downcast::<PyString>() {
            s.to_str().map_or(RawField::Absent, |s| RawField::Text(Cow::Borrowed(s)))
        } else {
            RawField::Absent
        }
    }

    /// Non-dict entries are skipped.
    fn extract_fills(fills: &PyList) -> Vec<FillRecord> {
        fills
            .iter()
            .filter_map(|item| item.downcast::<PyDict>().ok())
            .map(|dict| FillRecord::from_fields(|keys| py_field(dict, keys)))
            .collect()
    }

    fn build_config(minimum_volume_threshold: f64, pnl_epsilon: f64) -> PyResult<EngineConfig> {
        Ok(EngineConfig::default()
            .with_minimum_volume_threshold(minimum_volume_threshold)?
            .with_pnl_epsilon(pnl_epsilon)?)
    }

    /// Negative windows are an empty window.
    fn window_size(recent_n: i64) -> usize {
        usize::try_from(recent_n).unwrap_or(0)
    }

    #[pyfunction]
    #[pyo3(name = "aggregate_round_trips")]
    #[pyo3(signature=(
        fills,
        minimum_volume_threshold = DEFAULT_MINIMUM_VOLUME_THRESHOLD,
        pnl_epsilon = DEFAULT_PNL_EPSILON
    ))]
    pub fn py_aggregate_round_trips(
        py: Python<'_>,
        fills:                    &PyList,
        minimum_volume_threshold: f64,
        pnl_epsilon:              f64,
    ) -> PyResult<PyObject> {
        let cfg   = build_config(minimum_volume_threshold, pnl_epsilon)?;
        let fills = extract_fills(fills);
        let trips = py.allow_threads(|| aggregate_round_trips(&fills, &cfg));

        let out = PyList::empty(py);
        for trip in &trips {
            let d = PyDict::new(py);
            d.set_item("instrument",      &trip.instrument)?;
            d.set_item("realized_pnl",    trip.realized_pnl)?;
            d.set_item("notional_volume", trip.notional_volume)?;
            d.set_item("end_timestamp",   trip.end_timestamp)?;
            d.set_item("fill_count",      trip.fill_count)?;
            out.append(d)?;
        }
        Ok(out.into())
    }

    #[pyfunction]
    #[pyo3(name = "calculate_win_rate")]
    #[pyo3(signature=(
        fills,
        recent_n = DEFAULT_RECENT_N as i64,
        minimum_volume_threshold = DEFAULT_MINIMUM_VOLUME_THRESHOLD
    ))]
    pub fn py_calculate_win_rate(
        py: Python<'_>,
        fills:                    &PyList,
        recent_n:                 i64,
        minimum_volume_threshold: f64,
    ) -> PyResult<Option<PyObject>> {
        let cfg   = build_config(minimum_volume_threshold, DEFAULT_PNL_EPSILON)?
            .with_recent_n(window_size(recent_n));
        let fills = extract_fills(fills);

        let result = match py.allow_threads(|| calculate_win_rate(&fills, &cfg)) {
            Some(r) => r,
            None    => return Ok(None),
        };

        let d = PyDict::new(py);
        d.set_item("win_rate_percent", result.win_rate_percent)?;
        d.set_item("sample_size",      result.sample_size)?;
        d.set_item("win_count",        result.win_count)?;
        d.set_item("loss_count",       result.loss_count)?;
        Ok(Some(d.into()))
    }

    #[pyfunction]
    #[pyo3(name = "cumulative_pnl")]
    #[pyo3(signature=(fills, minimum_volume_threshold = DEFAULT_MINIMUM_VOLUME_THRESHOLD))]
    pub fn py_cumulative_pnl<'py>(
        py: Python<'py>,
        fills:                    &PyList,
        minimum_volume_threshold: f64,
    ) -> PyResult<&'py PyArray1<f64>> {
        let cfg   = build_config(minimum_volume_threshold, DEFAULT_PNL_EPSILON)?;
        let fills = extract_fills(fills);
        let curve = py.allow_threads(|| cumulative_pnl_curve(&aggregate_round_trips(&fills, &cfg)));
        Ok(curve.into_pyarray(py))
    }

    #[pyfunction]
    #[pyo3(name = "max_drawdown")]
    #[pyo3(signature=(fills, minimum_volume_threshold = DEFAULT_MINIMUM_VOLUME_THRESHOLD))]
    pub fn py_max_drawdown(
        py: Python<'_>,
        fills:                    &PyList,
        minimum_volume_threshold: f64,
    ) -> PyResult<f64> {
        let cfg   = build_config(minimum_volume_threshold, DEFAULT_PNL_EPSILON)?;
        let fills = extract_fills(fills);
        Ok(py.allow_threads(|| max_drawdown(&cumulative_pnl_curve(&aggregate_round_trips(&fills, &cfg)))))
    }
}
