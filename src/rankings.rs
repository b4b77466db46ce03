// =============================================================================
// Rankings — change computation and published result snapshots
// =============================================================================
//
// Two derived result sets are recomputed wholesale once per scan cycle:
//
//   1. Per-window OI movers — largest relative open-interest change over the
//      window's lookback, ranked by absolute change, capped at top_n.
//   2. Combined movers — symbols whose OI *and* volume both rose between the
//      two most recent samples, ranked by the sum of the two changes.
//
// The RankingsBoard is the only surface query handlers touch: each published
// list is replaced as a whole Arc, so a reader never observes a partially
// updated ranking.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::history::HistoryStore;
use crate::types::{CombinedMover, OiMover, Window};

/// Percentage change from `previous` to `current`.  Callers must have
/// excluded `previous == 0` already.
fn pct_change(previous: f64, current: f64) -> f64 {
    (current - previous) / previous * 100.0
}

// =============================================================================
// Change engine
// =============================================================================

/// Compute the OI movers ranking for one window.
///
/// A symbol qualifies when at least two of its samples fall inside the
/// window's lookback from `now` and the earliest qualifying value is
/// non-zero.  `previous` is the earliest qualifying sample, `current` the
/// latest.  Results are sorted by descending absolute change and truncated
/// to `top_n`.
pub fn compute_window_movers(
    store: &HistoryStore,
    window: Window,
    now: DateTime<Utc>,
    top_n: usize,
) -> Vec<OiMover> {
    let mut snapshot = store.window_snapshot(window, now);
    // Deterministic input order so that equal-change ties rank stably.
    snapshot.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut movers = Vec::new();
    for (symbol, samples) in snapshot {
        if samples.len() < 2 {
            continue;
        }
        let previous = samples[0].value;
        let current = samples[samples.len() - 1].value;
        if previous == 0.0 {
            continue;
        }
        movers.push(OiMover {
            symbol,
            oi_change_pct: pct_change(previous, current),
            current_oi: current,
            previous_oi: previous,
        });
    }

    movers.sort_by(|a, b| {
        b.oi_change_pct
            .abs()
            .partial_cmp(&a.oi_change_pct.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    movers.truncate(top_n);
    movers
}

// =============================================================================
// Combined-signal engine
// =============================================================================

/// Compute the "OI and volume both rising" list.
///
/// For every symbol in the volume history: requires two volume samples and
/// two samples in the 1h OI sequence — the two most recent *raw* samples in
/// both cases, regardless of how long ago they were taken.  A symbol is
/// included only when both changes are strictly positive.  Sorted by the sum
/// of the two percentage changes, descending, uncapped.
pub fn compute_combined_movers(store: &HistoryStore) -> Vec<CombinedMover> {
    let mut symbols = store.volume_symbols();
    symbols.sort();

    let mut movers = Vec::new();
    for symbol in symbols {
        let Some((vol_prev, vol_curr)) = store.last_two_volume(&symbol) else {
            continue;
        };
        let Some((oi_prev, oi_curr)) = store.last_two_oi(&symbol, Window::H1) else {
            continue;
        };
        if vol_prev.value == 0.0 || oi_prev.value == 0.0 {
            continue;
        }

        let volume_change_pct = pct_change(vol_prev.value, vol_curr.value);
        let oi_change_pct = pct_change(oi_prev.value, oi_curr.value);
        if volume_change_pct <= 0.0 || oi_change_pct <= 0.0 {
            continue;
        }

        movers.push(CombinedMover {
            symbol,
            volume_change_pct,
            oi_change_pct,
            current_volume: vol_curr.value,
            previous_volume: vol_prev.value,
            current_oi: oi_curr.value,
            previous_oi: oi_prev.value,
        });
    }

    movers.sort_by(|a, b| {
        let sum_a = a.volume_change_pct + a.oi_change_pct;
        let sum_b = b.volume_change_pct + b.oi_change_pct;
        sum_b.partial_cmp(&sum_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    movers
}

// =============================================================================
// RankingsBoard — published snapshots
// =============================================================================

/// Holds the last-published ranking snapshots for read access by the API.
///
/// The scanner loop is the only writer; it replaces each snapshot wholesale.
/// Readers get a cheap `Arc` clone and see either the previous or the new
/// list, never a mix.
pub struct RankingsBoard {
    windows: RwLock<HashMap<Window, Arc<Vec<OiMover>>>>,
    combined: RwLock<Arc<Vec<CombinedMover>>>,
    last_scan: RwLock<Option<DateTime<Utc>>>,
}

impl RankingsBoard {
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            combined: RwLock::new(Arc::new(Vec::new())),
            last_scan: RwLock::new(None),
        }
    }

    /// Replace the published ranking for `window`.
    pub fn publish_window(&self, window: Window, movers: Vec<OiMover>) {
        self.windows.write().insert(window, Arc::new(movers));
    }

    /// Replace the published combined list.
    pub fn publish_combined(&self, movers: Vec<CombinedMover>) {
        *self.combined.write() = Arc::new(movers);
    }

    /// Stamp the completion time of a scan cycle.  Staleness of this value is
    /// the consumer-visible signal that the upstream is unavailable.
    pub fn mark_scanned(&self, ts: DateTime<Utc>) {
        *self.last_scan.write() = Some(ts);
    }

    /// Latest ranking for `window`; empty before the first publish.
    pub fn window_ranking(&self, window: Window) -> Arc<Vec<OiMover>> {
        self.windows
            .read()
            .get(&window)
            .cloned()
            .unwrap_or_default()
    }

    /// Latest combined list; empty before the first publish.
    pub fn combined_ranking(&self) -> Arc<Vec<CombinedMover>> {
        self.combined.read().clone()
    }

    /// Completion time of the most recent scan cycle, if any.
    pub fn last_scan(&self) -> Option<DateTime<Utc>> {
        *self.last_scan.read()
    }
}

impl Default for RankingsBoard {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
