// =============================================================================
// Central Application State — OI Scanner
// =============================================================================
//
// The single source of truth for the process. The scanner loop writes the
// history store and rankings board; the API layer only ever reads.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - Arc wrappers for subsystems with their own interior mutability.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::history::HistoryStore;
use crate::rankings::RankingsBoard;
use crate::runtime_config::RuntimeConfig;

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, bumped once per completed
    /// scan cycle and on error-log writes.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Sampling & results ──────────────────────────────────────────────
    pub history: Arc<HistoryStore>,
    pub rankings: Arc<RankingsBoard>,

    /// Symbol universe fixed at the end of bootstrap; empty until then.
    pub symbol_universe: RwLock<Vec<String>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the process started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.
    ///
    /// The returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        let history = Arc::new(HistoryStore::new(config.history_depth));

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            history,
            rankings: Arc::new(RankingsBoard::new()),
            symbol_universe: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_counter_increments() {
        let state = AppState::new(RuntimeConfig::default());
        assert_eq!(state.current_state_version(), 1);
        state.increment_version();
        assert_eq!(state.current_state_version(), 2);
    }

    #[test]
    fn error_ring_is_capped() {
        let state = AppState::new(RuntimeConfig::default());
        for i in 0..60 {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors.first().unwrap().message, "error 10");
        assert_eq!(errors.last().unwrap().message, "error 59");
    }

    #[test]
    fn history_depth_comes_from_config() {
        let config = RuntimeConfig {
            history_depth: 3,
            ..RuntimeConfig::default()
        };
        let state = AppState::new(config);
        let now = Utc::now();
        for i in 0..5 {
            state.history.append_volume("BTCUSDT", now, 1000.0 + i as f64);
        }
        assert_eq!(state.history.volume_len("BTCUSDT"), 3);
    }
}
