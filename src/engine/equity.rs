// src/engine/equity.rs

use ndarray::Array1;

use crate::engine::round_trip::RoundTrip;

/// Running realized PnL after each round trip, in the order given
/// (normally end-time ascending, as `aggregate_round_trips` returns them).
pub fn cumulative_pnl_curve(trips: &[RoundTrip]) -> Array1<f64> {
    let mut curve = Array1::from_iter(trips.iter().map(|t| t.realized_pnl));
    curve.accumulate_axis_inplace(ndarray::Axis(0), |&prev, cur| *cur += prev);
    curve
}

/// Largest peak-to-trough fall of a cumulative PnL curve, in PnL units.
/// The peak starts at 0, the flat account before the first trip.
pub fn max_drawdown(curve: &Array1<f64>) -> f64 {
    let mut peak   = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for &equity in curve.iter() {
        peak   = peak.max(equity);
        max_dd = max_dd.max(peak - equity);
    }
    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn trip(pnl: f64) -> RoundTrip {
        RoundTrip {
            instrument:      "X".into(),
            realized_pnl:    pnl,
            notional_volume: 500.0,
            end_timestamp:   0,
            fill_count:      2,
        }
    }

    #[test]
    fn curve_is_running_sum() {
        let curve = cumulative_pnl_curve(&[trip(10.0), trip(-4.0), trip(6.0)]);
        assert_eq!(curve, array![10.0, 6.0, 12.0]);
    }

    #[test]
    fn empty_curve() {
        let curve = cumulative_pnl_curve(&[]);
        assert!(curve.is_empty());
        assert_eq!(max_drawdown(&curve), 0.0);
    }

    #[test]
    fn drawdown_from_running_peak() {
        assert_eq!(max_drawdown(&array![10.0, 6.0, 12.0, 2.0, 5.0]), 10.0);
        assert_eq!(max_drawdown(&array![1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn drawdown_counts_losses_from_flat_start() {
        assert_eq!(max_drawdown(&array![-5.0, -3.0]), 5.0);
    }
}
