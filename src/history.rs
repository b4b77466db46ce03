// ---------------------------------------------------------------------------
// HistoryStore -- bounded per-symbol sample history
// ---------------------------------------------------------------------------
//
// Open interest is kept per (window, symbol): the same raw value is appended
// into all three windows every cycle, since windows differ only in how much
// history is later considered relevant, not in sampling cadence.  Volume is a
// single rolling sequence per symbol, consulted via its last two samples.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::{Sample, Window};

/// Thread-safe store of bounded, time-ordered sample sequences.
///
/// The scanner loop is the sole writer; sequences are created lazily on the
/// first successful sample and trimmed to `depth` after every append, so a
/// sequence never exceeds `depth` entries.  Timestamps within a sequence are
/// non-decreasing because appends always carry the current cycle's clock.
pub struct HistoryStore {
    oi: RwLock<HashMap<(Window, String), VecDeque<Sample>>>,
    volume: RwLock<HashMap<String, VecDeque<Sample>>>,
    depth: usize,
}

impl HistoryStore {
    /// Create a store that retains at most `depth` samples per sequence.
    pub fn new(depth: usize) -> Self {
        Self {
            oi: RwLock::new(HashMap::new()),
            volume: RwLock::new(HashMap::new()),
            depth,
        }
    }

    // -------------------------------------------------------------------------
    // Appends
    // -------------------------------------------------------------------------

    /// Append one open-interest observation for `symbol` into every window's
    /// sequence, trimming each to the retention depth.
    pub fn append_open_interest(&self, symbol: &str, ts: DateTime<Utc>, value: f64) {
        let mut map = self.oi.write();
        for window in Window::ALL {
            let ring = map
                .entry((window, symbol.to_string()))
                .or_insert_with(|| VecDeque::with_capacity(self.depth + 1));
            ring.push_back(Sample::new(ts, value));
            while ring.len() > self.depth {
                ring.pop_front();
            }
        }
    }

    /// Append one quote-volume observation for `symbol`, trimming to the
    /// retention depth.
    pub fn append_volume(&self, symbol: &str, ts: DateTime<Utc>, value: f64) {
        let mut map = self.volume.write();
        let ring = map
            .entry(symbol.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.depth + 1));
        ring.push_back(Sample::new(ts, value));
        while ring.len() > self.depth {
            ring.pop_front();
        }
    }

    // -------------------------------------------------------------------------
    // Window reads (OI change computation)
    // -------------------------------------------------------------------------

    /// Samples for `symbol` in `window` with `ts >= now - lookback`, in
    /// original (oldest-first) order.
    pub fn window_samples(
        &self,
        symbol: &str,
        window: Window,
        now: DateTime<Utc>,
    ) -> Vec<Sample> {
        let cutoff = now - window.lookback();
        let map = self.oi.read();
        match map.get(&(window, symbol.to_string())) {
            Some(ring) => ring.iter().filter(|s| s.ts >= cutoff).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Every symbol tracked in `window` together with its in-lookback
    /// subsequence.  Symbols whose samples have all aged out come back with an
    /// empty vec and are skipped by the change engine.
    pub fn window_snapshot(
        &self,
        window: Window,
        now: DateTime<Utc>,
    ) -> Vec<(String, Vec<Sample>)> {
        let cutoff = now - window.lookback();
        let map = self.oi.read();
        map.iter()
            .filter(|((w, _), _)| *w == window)
            .map(|((_, symbol), ring)| {
                let filtered: Vec<Sample> =
                    ring.iter().filter(|s| s.ts >= cutoff).copied().collect();
                (symbol.clone(), filtered)
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Last-two reads (combined-signal computation)
    // -------------------------------------------------------------------------

    /// The two most recent OI samples for `symbol` in `window` as
    /// (previous, current), irrespective of how old they are.
    pub fn last_two_oi(&self, symbol: &str, window: Window) -> Option<(Sample, Sample)> {
        let map = self.oi.read();
        let ring = map.get(&(window, symbol.to_string()))?;
        last_two(ring)
    }

    /// The two most recent volume samples for `symbol` as (previous, current).
    pub fn last_two_volume(&self, symbol: &str) -> Option<(Sample, Sample)> {
        let map = self.volume.read();
        let ring = map.get(symbol)?;
        last_two(ring)
    }

    /// Symbols that have at least one volume sample.  This is the iteration
    /// domain of the combined-signal engine.
    pub fn volume_symbols(&self) -> Vec<String> {
        self.volume.read().keys().cloned().collect()
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Number of OI samples currently held for `symbol` in `window`.
    pub fn oi_len(&self, symbol: &str, window: Window) -> usize {
        self.oi
            .read()
            .get(&(window, symbol.to_string()))
            .map_or(0, VecDeque::len)
    }

    /// Number of volume samples currently held for `symbol`.
    pub fn volume_len(&self, symbol: &str) -> usize {
        self.volume.read().get(symbol).map_or(0, VecDeque::len)
    }
}

fn last_two(ring: &VecDeque<Sample>) -> Option<(Sample, Sample)> {
    if ring.len() < 2 {
        return None;
    }
    let current = *ring.back()?;
    let previous = *ring.get(ring.len() - 2)?;
    Some((previous, current))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn oi_append_populates_all_windows() {
        let store = HistoryStore::new(30);
        store.append_open_interest("BTCUSDT", t0(), 100.0);

        for w in Window::ALL {
            assert_eq!(store.oi_len("BTCUSDT", w), 1);
        }
        assert_eq!(store.volume_len("BTCUSDT"), 0);
    }

    #[test]
    fn sequences_never_exceed_depth() {
        let store = HistoryStore::new(30);
        for i in 0..45 {
            let ts = t0() + Duration::minutes(5 * i);
            store.append_open_interest("ETHUSDT", ts, 100.0 + i as f64);
            store.append_volume("ETHUSDT", ts, 1000.0 + i as f64);
        }

        for w in Window::ALL {
            assert_eq!(store.oi_len("ETHUSDT", w), 30);
        }
        assert_eq!(store.volume_len("ETHUSDT"), 30);

        // Oldest entries were dropped: the head of the ring is sample #15.
        let samples = store.window_samples("ETHUSDT", Window::H24, t0() + Duration::days(1));
        assert_eq!(samples.first().unwrap().value, 115.0);
        assert_eq!(samples.last().unwrap().value, 144.0);
    }

    #[test]
    fn window_samples_filters_by_lookback() {
        let store = HistoryStore::new(30);
        let now = t0() + Duration::hours(3);

        store.append_open_interest("BTCUSDT", t0(), 100.0); // 3h old
        store.append_open_interest("BTCUSDT", now - Duration::minutes(30), 110.0);
        store.append_open_interest("BTCUSDT", now, 120.0);

        let h1 = store.window_samples("BTCUSDT", Window::H1, now);
        assert_eq!(h1.len(), 2);
        assert_eq!(h1[0].value, 110.0);

        let h4 = store.window_samples("BTCUSDT", Window::H4, now);
        assert_eq!(h4.len(), 3);
    }

    #[test]
    fn window_cutoff_is_inclusive() {
        let store = HistoryStore::new(30);
        let now = t0() + Duration::hours(1);

        // Exactly on the 1h boundary — still inside.
        store.append_open_interest("BTCUSDT", t0(), 100.0);
        let h1 = store.window_samples("BTCUSDT", Window::H1, now);
        assert_eq!(h1.len(), 1);
    }

    #[test]
    fn last_two_requires_two_samples() {
        let store = HistoryStore::new(30);
        assert!(store.last_two_volume("BTCUSDT").is_none());

        store.append_volume("BTCUSDT", t0(), 1000.0);
        assert!(store.last_two_volume("BTCUSDT").is_none());

        store.append_volume("BTCUSDT", t0() + Duration::hours(1), 1100.0);
        let (prev, curr) = store.last_two_volume("BTCUSDT").unwrap();
        assert_eq!(prev.value, 1000.0);
        assert_eq!(curr.value, 1100.0);
    }

    #[test]
    fn last_two_oi_ignores_sample_age() {
        let store = HistoryStore::new(30);
        // Both samples far older than the 1h lookback.
        store.append_open_interest("BTCUSDT", t0() - Duration::days(2), 100.0);
        store.append_open_interest("BTCUSDT", t0() - Duration::days(1), 150.0);

        let (prev, curr) = store.last_two_oi("BTCUSDT", Window::H1).unwrap();
        assert_eq!(prev.value, 100.0);
        assert_eq!(curr.value, 150.0);
    }

    #[test]
    fn volume_symbols_lists_tracked_symbols() {
        let store = HistoryStore::new(30);
        store.append_volume("BTCUSDT", t0(), 1.0);
        store.append_volume("ETHUSDT", t0(), 2.0);
        store.append_open_interest("SOLUSDT", t0(), 3.0); // OI only

        let mut symbols = store.volume_symbols();
        symbols.sort();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn window_snapshot_groups_per_symbol() {
        let store = HistoryStore::new(30);
        let now = t0();
        store.append_open_interest("BTCUSDT", now, 1.0);
        store.append_open_interest("ETHUSDT", now, 2.0);

        let snapshot = store.window_snapshot(Window::H4, now);
        assert_eq!(snapshot.len(), 2);
        for (_, samples) in snapshot {
            assert_eq!(samples.len(), 1);
        }
    }
}
