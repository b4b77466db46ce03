// =============================================================================
// Scanner Loop — bootstrap + steady-state acquisition cycles
// =============================================================================
//
// State machine: Bootstrapping -> SteadyState.
//
// Bootstrapping keeps retrying the symbol-universe fetch at a coarse cadence
// until it succeeds; the fetched universe is then fixed for the process
// lifetime.  Each steady-state cycle samples every symbol with bounded
// concurrency, appends to the history store, recomputes all rankings and
// publishes them.  This task is the sole writer of the history store and the
// rankings board.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::binance::FuturesClient;
use crate::rankings::{compute_combined_movers, compute_window_movers};
use crate::types::Window;

/// Run the scanner until `shutdown` signals.
///
/// Spawned once from `main`; the retained `JoinHandle` plus the watch sender
/// give the process a graceful stop between cycles.
pub async fn run_scanner(
    state: Arc<AppState>,
    client: FuturesClient,
    mut shutdown: watch::Receiver<bool>,
) {
    // ── Bootstrapping ────────────────────────────────────────────────────
    // A preset universe (env override from main) skips the exchangeInfo
    // bootstrap entirely.
    let preset = state.symbol_universe.read().clone();
    let symbols = if !preset.is_empty() {
        preset
    } else {
        bootstrap_universe(&state, &client, &mut shutdown).await
    };
    if symbols.is_empty() {
        // Shutdown arrived before the universe did.
        return;
    }

    *state.symbol_universe.write() = symbols.clone();
    info!(count = symbols.len(), "symbol universe fixed — entering steady state");

    // ── SteadyState ──────────────────────────────────────────────────────
    loop {
        let cycle_start = Utc::now();
        run_cycle(&state, &client, &symbols, cycle_start).await;

        let interval_secs = state.runtime_config.read().scan_interval_secs;
        if sleep_or_shutdown(&mut shutdown, Duration::from_secs(interval_secs)).await {
            info!("shutdown between scan cycles");
            return;
        }
    }
}

/// Retry the universe fetch at the bootstrap cadence until it yields symbols
/// or shutdown is signalled (in which case an empty vec is returned).
async fn bootstrap_universe(
    state: &Arc<AppState>,
    client: &FuturesClient,
    shutdown: &mut watch::Receiver<bool>,
) -> Vec<String> {
    loop {
        let fetched = client.fetch_perpetual_symbols().await;
        if !fetched.is_empty() {
            return fetched;
        }

        let retry_secs = state.runtime_config.read().bootstrap_retry_secs;
        state.push_error("symbol universe unavailable, retrying".to_string());
        warn!(retry_secs, "no symbols fetched — retrying");

        if sleep_or_shutdown(shutdown, Duration::from_secs(retry_secs)).await {
            info!("shutdown during bootstrap");
            return Vec::new();
        }
    }
}

/// One steady-state cycle: sample every symbol, append, recompute, publish.
async fn run_cycle(
    state: &Arc<AppState>,
    client: &FuturesClient,
    symbols: &[String],
    now: DateTime<Utc>,
) {
    let concurrency = state.runtime_config.read().fetch_concurrency;

    // Bounded fan-out; each fetch is fail-soft, so one flaky symbol never
    // stalls or aborts the others.
    let results: Vec<(String, Option<f64>, Option<(f64, f64)>)> =
        stream::iter(symbols.iter().cloned())
            .map(|symbol| {
                let client = client.clone();
                async move {
                    let oi = client.fetch_open_interest(&symbol).await;
                    let volume = client.fetch_volume_pair(&symbol).await;
                    (symbol, oi, volume)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    let mut sampled = 0usize;
    for (symbol, oi, volume) in results {
        if oi.is_some() || volume.is_some() {
            sampled += 1;
        }
        if let Some(oi) = oi {
            state.history.append_open_interest(&symbol, now, oi);
        }
        // The kline fetch yields (current, previous); only the current
        // bucket enters the history — "previous" exists so that a symbol
        // with a single candle reads as a failed sample.
        if let Some((current, _previous)) = volume {
            state.history.append_volume(&symbol, now, current);
        }
    }

    recompute_and_publish(state, now);
    info!(
        symbols = symbols.len(),
        sampled,
        at = %now.format("%Y-%m-%d %H:%M:%S"),
        "scan cycle complete"
    );
}

/// Recompute every window ranking and the combined list from the history
/// store, then replace the published snapshots.
pub fn recompute_and_publish(state: &AppState, now: DateTime<Utc>) {
    let top_n = state.runtime_config.read().top_n;

    for window in Window::ALL {
        let movers = compute_window_movers(&state.history, window, now, top_n);
        state.rankings.publish_window(window, movers);
    }
    state
        .rankings
        .publish_combined(compute_combined_movers(&state.history));

    state.rankings.mark_scanned(now);
    state.increment_version();
}

/// Sleep for `duration` unless shutdown is signalled first; returns `true`
/// when the caller should stop.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(RuntimeConfig::default()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn publish_replaces_all_snapshots_and_stamps_scan() {
        let state = test_state();
        let t_prev = now() - ChronoDuration::minutes(30);

        state.history.append_open_interest("BTCUSDT", t_prev, 100.0);
        state.history.append_open_interest("BTCUSDT", now(), 150.0);
        state.history.append_volume("BTCUSDT", t_prev, 1000.0);
        state.history.append_volume("BTCUSDT", now(), 1200.0);

        let version_before = state.current_state_version();
        recompute_and_publish(&state, now());

        for window in Window::ALL {
            let ranking = state.rankings.window_ranking(window);
            assert_eq!(ranking.len(), 1, "window {window}");
            assert!((ranking[0].oi_change_pct - 50.0).abs() < 1e-9);
        }

        let combined = state.rankings.combined_ranking();
        assert_eq!(combined.len(), 1);
        assert!((combined[0].volume_change_pct - 20.0).abs() < 1e-9);
        assert!((combined[0].oi_change_pct - 50.0).abs() < 1e-9);

        assert_eq!(state.rankings.last_scan(), Some(now()));
        assert!(state.current_state_version() > version_before);
    }

    #[test]
    fn publish_with_empty_history_publishes_empty_lists() {
        let state = test_state();
        recompute_and_publish(&state, now());

        for window in Window::ALL {
            assert!(state.rankings.window_ranking(window).is_empty());
        }
        assert!(state.rankings.combined_ranking().is_empty());
        assert_eq!(state.rankings.last_scan(), Some(now()));
    }

    #[test]
    fn falling_volume_symbol_excluded_from_combined_but_ranked_by_window() {
        let state = test_state();
        let t_prev = now() - ChronoDuration::minutes(30);

        state.history.append_open_interest("BTCUSDT", t_prev, 100.0);
        state.history.append_open_interest("BTCUSDT", now(), 150.0);
        state.history.append_volume("BTCUSDT", t_prev, 1000.0);
        state.history.append_volume("BTCUSDT", now(), 900.0);

        recompute_and_publish(&state, now());

        assert_eq!(state.rankings.window_ranking(Window::H1).len(), 1);
        assert!(state.rankings.combined_ranking().is_empty());
    }

    #[tokio::test]
    async fn sleep_or_shutdown_returns_true_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        assert!(sleep_or_shutdown(&mut rx, Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn sleep_or_shutdown_returns_false_after_sleep() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!sleep_or_shutdown(&mut rx, Duration::from_millis(5)).await);
    }
}
