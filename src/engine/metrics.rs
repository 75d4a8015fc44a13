// src/engine/metrics.rs

use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::fill::FillRecord;
use crate::engine::round_trip::{aggregate_round_trips, RoundTrip};

/// Win rate over the most recent round trips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WinRateResult {
    pub win_rate_percent: f64,    // 0..=100, two decimals
    pub sample_size:      usize,  // trips in the window
    pub win_count:        usize,
    pub loss_count:       usize,
}

/// `wins / sample * 100` to two decimals, halves away from zero.
/// Rounded in integer hundredths so exact halves are not lost to binary
/// representation first.
pub fn win_rate_percent(win_count: usize, sample_size: usize) -> f64 {
    if sample_size == 0 {
        return 0.0;
    }
    let hundredths = (win_count as u128 * 20_000 + sample_size as u128) / (2 * sample_size as u128);
    hundredths as f64 / 100.0
}

/// Reduce time-ascending round trips to a win rate over the last
/// `recent_n`. `None` when the window is empty, which callers must show
/// as "insufficient data" rather than 0%.
pub fn win_rate_from_round_trips(trips: &[RoundTrip], recent_n: usize) -> Option<WinRateResult> {
    let take   = recent_n.min(trips.len());
    let window = &trips[trips.len() - take..];
    if window.is_empty() {
        return None;
    }

    let sample_size = window.len();
    let win_count   = window.iter().filter(|t| t.realized_pnl > 0.0).count();
    let loss_count  = sample_size - win_count;

    Some(WinRateResult {
        win_rate_percent: win_rate_percent(win_count, sample_size),
        sample_size,
        win_count,
        loss_count,
    })
}

/// Aggregate `fills` into round trips and compute the win rate over the
/// last `cfg.recent_n` of them.
pub fn calculate_win_rate(fills: &[FillRecord], cfg: &EngineConfig) -> Option<WinRateResult> {
    let trips  = aggregate_round_trips(fills, cfg);
    let result = win_rate_from_round_trips(&trips, cfg.recent_n);
    match &result {
        Some(r) => log::debug!(
            "win rate {:.2}% over {} trips ({} wins, {} losses)",
            r.win_rate_percent, r.sample_size, r.win_count, r.loss_count
        ),
        None => log::debug!("win rate unavailable: {} round trips, window {}", trips.len(), cfg.recent_n),
    }
    result
}
