// =============================================================================
// OI Scanner — Main Entry Point
// =============================================================================
//
// Wires together the runtime config, shared state, the background scanner
// task and the read-only REST API, then waits for Ctrl+C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod history;
mod rankings;
mod runtime_config;
mod scanner;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::FuturesClient;
use crate::runtime_config::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        OI Scanner — Starting Up                          ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config = RuntimeConfig::load("runtime_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    info!(
        base_url = %config.base_url,
        scan_interval_secs = config.scan_interval_secs,
        "Scanner configured"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // Optional universe override: comma-separated symbols skip the
    // exchangeInfo bootstrap entirely (useful for local runs and tests).
    if let Ok(syms) = std::env::var("OI_SCANNER_SYMBOLS") {
        let symbols: Vec<String> = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !symbols.is_empty() {
            info!(count = symbols.len(), "Symbol universe overridden from env");
            *state.symbol_universe.write() = symbols;
        }
    }

    // ── 3. Build the upstream client ─────────────────────────────────────
    let client = {
        let cfg = state.runtime_config.read();
        FuturesClient::new(
            cfg.base_url.clone(),
            Duration::from_secs(cfg.fetch_timeout_secs),
            Duration::from_secs(cfg.universe_timeout_secs),
            cfg.universe_retry_attempts,
            Duration::from_secs(cfg.universe_retry_delay_secs),
        )
    };

    // ── 4. Spawn the scanner loop ────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scanner_state = state.clone();
    let scanner_handle = tokio::spawn(async move {
        scanner::run_scanner(scanner_state, client, shutdown_rx).await;
    });
    info!("Scanner loop launched");

    // ── 5. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr =
        std::env::var("OI_SCANNER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let bind_addr_clone = bind_addr.clone();

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr_clone)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr_clone, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    let _ = shutdown_tx.send(true);
    // The scanner exits between cycles; don't wait out a full in-flight
    // sampling pass.
    if tokio::time::timeout(Duration::from_secs(10), scanner_handle)
        .await
        .is_err()
    {
        warn!("scanner still mid-cycle after 10s — exiting anyway");
    }

    if let Err(e) = state.runtime_config.read().save("runtime_config.json") {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("OI Scanner shut down complete.");
    Ok(())
}
