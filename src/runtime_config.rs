// =============================================================================
// Runtime Configuration — scanner settings with atomic save
// =============================================================================
//
// Every tunable of the scanner lives here: upstream base URL, scan cadence,
// retry bounds and history/ranking sizes.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_bootstrap_retry_secs() -> u64 {
    30
}

fn default_universe_retry_attempts() -> u32 {
    5
}

fn default_universe_retry_delay_secs() -> u64 {
    5
}

fn default_universe_timeout_secs() -> u64 {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_fetch_concurrency() -> usize {
    16
}

fn default_history_depth() -> usize {
    30
}

fn default_top_n() -> usize {
    20
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the scanner.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Upstream -----------------------------------------------------------

    /// Base URL of the Binance USDT-M futures REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // --- Cadence ------------------------------------------------------------

    /// Seconds between steady-state scan cycles.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Seconds to wait before retrying the symbol-universe fetch while
    /// bootstrapping.
    #[serde(default = "default_bootstrap_retry_secs")]
    pub bootstrap_retry_secs: u64,

    // --- Universe fetch retry bounds ----------------------------------------

    /// Attempts per universe fetch before giving up for this round.
    #[serde(default = "default_universe_retry_attempts")]
    pub universe_retry_attempts: u32,

    /// Fixed sleep between universe fetch attempts.
    #[serde(default = "default_universe_retry_delay_secs")]
    pub universe_retry_delay_secs: u64,

    /// Request timeout for the universe fetch.
    #[serde(default = "default_universe_timeout_secs")]
    pub universe_timeout_secs: u64,

    // --- Per-symbol sampling ------------------------------------------------

    /// Request timeout for single-attempt per-symbol fetches.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of per-symbol fetches in flight at once.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    // --- Retention & ranking ------------------------------------------------

    /// Maximum samples retained per history sequence.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Entries kept in each per-window movers ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scan_interval_secs: default_scan_interval_secs(),
            bootstrap_retry_secs: default_bootstrap_retry_secs(),
            universe_retry_attempts: default_universe_retry_attempts(),
            universe_retry_delay_secs: default_universe_retry_delay_secs(),
            universe_timeout_secs: default_universe_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_concurrency: default_fetch_concurrency(),
            history_depth: default_history_depth(),
            top_n: default_top_n(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            base_url = %config.base_url,
            scan_interval_secs = config.scan_interval_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.base_url, "https://fapi.binance.com");
        assert_eq!(cfg.scan_interval_secs, 300);
        assert_eq!(cfg.bootstrap_retry_secs, 30);
        assert_eq!(cfg.universe_retry_attempts, 5);
        assert_eq!(cfg.universe_retry_delay_secs, 5);
        assert_eq!(cfg.universe_timeout_secs, 10);
        assert_eq!(cfg.fetch_timeout_secs, 5);
        assert_eq!(cfg.fetch_concurrency, 16);
        assert_eq!(cfg.history_depth, 30);
        assert_eq!(cfg.top_n, 20);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.scan_interval_secs, 300);
        assert_eq!(cfg.history_depth, 30);
        assert_eq!(cfg.top_n, 20);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "scan_interval_secs": 60, "base_url": "http://localhost:9999" }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.scan_interval_secs, 60);
        assert_eq!(cfg.base_url, "http://localhost:9999");
        assert_eq!(cfg.bootstrap_retry_secs, 30);
        assert_eq!(cfg.fetch_concurrency, 16);
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = RuntimeConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.base_url, cfg2.base_url);
        assert_eq!(cfg.scan_interval_secs, cfg2.scan_interval_secs);
        assert_eq!(cfg.top_n, cfg2.top_n);
    }
}
