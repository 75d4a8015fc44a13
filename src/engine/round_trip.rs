// src/engine/round_trip.rs

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::fill::FillRecord;

/// One flat-to-flat position lifecycle on a single instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub instrument:      String,
    pub realized_pnl:    f64,  // sum of fill PnL
    pub notional_volume: f64,  // sum of |size| * price
    pub end_timestamp:   i64,  // last fill with non-zero PnL, else 0
    pub fill_count:      usize,
}

/// Running totals for the round trip currently being replayed.
#[derive(Default)]
struct Accumulator {
    pnl:        f64,
    volume:     f64,
    end_time:   i64,
    fill_count: usize,
}

impl Accumulator {
    fn add(&mut self, fill: &FillRecord) {
        self.volume += fill.notional();
        self.pnl    += fill.realized_pnl;
        if fill.realized_pnl != 0.0 {
            self.end_time = fill.timestamp;
        }
        self.fill_count += 1;
    }

    fn is_material(&self, cfg: &EngineConfig) -> bool {
        self.pnl.abs() > cfg.pnl_epsilon && self.volume >= cfg.minimum_volume_threshold
    }

    fn finish(&self, instrument: &str) -> RoundTrip {
        RoundTrip {
            instrument:      instrument.to_owned(),
            realized_pnl:    self.pnl,
            notional_volume: self.volume,
            end_timestamp:   self.end_time,
            fill_count:      self.fill_count,
        }
    }
}

/// Replay one instrument's fills (already time-ordered) and emit every
/// completed, material round trip.
fn replay_instrument(instrument: &str, fills: &[&FillRecord], cfg: &EngineConfig) -> Vec<RoundTrip> {
    let mut trips         = Vec::new();
    let mut current       = Accumulator::default();
    let mut in_round_trip = false;

    for &fill in fills {
        if fill.is_flat_before(cfg.flat_epsilon) {
            if in_round_trip {
                if current.is_material(cfg) {
                    trips.push(current.finish(instrument));
                } else {
                    log::debug!(
                        "{instrument}: dropping round trip ending {} (pnl {}, volume {})",
                        current.end_time, current.pnl, current.volume
                    );
                }
            }
            current       = Accumulator::default();
            in_round_trip = true;
        }
        current.add(fill);
    }

    // A position that is still open is not a trade yet; the tail only
    // counts when the last fill visibly closes all of it.
    if in_round_trip && current.is_material(cfg) {
        let closed = fills
            .last()
            .map_or(false, |last| last.closes_entire_position(cfg.close_tolerance));
        if closed {
            trips.push(current.finish(instrument));
        } else {
            log::trace!("{instrument}: open tail with pnl {} left unreported", current.pnl);
        }
    }

    trips
}

/// Reconstruct round trips from an unordered fill stream, sorted by
/// `end_timestamp` ascending.
///
/// Fills are grouped per instrument and replayed independently; a fill whose
/// `position_before` is flat starts a new round trip and closes out the
/// previous one. Trips below `minimum_volume_threshold` or with
/// `|pnl| <= pnl_epsilon` are dropped.
///
/// Both sorts are stable. Equal timestamps within an instrument keep input
/// order, and equal end times across instruments come out in instrument
/// order.
pub fn aggregate_round_trips(fills: &[FillRecord], cfg: &EngineConfig) -> Vec<RoundTrip> {
    let mut groups: BTreeMap<&str, Vec<&FillRecord>> = BTreeMap::new();
    for fill in fills {
        groups.entry(fill.instrument.as_str()).or_default().push(fill);
    }

    let groups: Vec<(&str, Vec<&FillRecord>)> = groups.into_iter().collect();
    let per_instrument: Vec<Vec<RoundTrip>> = groups
        .into_par_iter()
        .map(|(instrument, mut group)| {
            group.sort_by_key(|f| f.timestamp);
            log::trace!("{instrument}: replaying {} fills", group.len());
            replay_instrument(instrument, &group, cfg)
        })
        .collect();

    let mut trips: Vec<RoundTrip> = per_instrument.into_iter().flatten().collect();
    trips.sort_by_key(|t| t.end_timestamp);

    log::debug!("{} fills -> {} round trips", fills.len(), trips.len());
    trips
}

/// `aggregate_round_trips` with `EngineConfig::default()`.
pub fn aggregate_round_trips_default(fills: &[FillRecord]) -> Vec<RoundTrip> {
    aggregate_round_trips(fills, &EngineConfig::default())
}
