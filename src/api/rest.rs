// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Thin read-only layer over the rankings board. All endpoints live under
// `/api/v1/` except the dashboard page at `/`. There is no write surface:
// every mutation happens inside the scanner loop.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::api::dashboard::DASHBOARD_HTML;
use crate::app_state::AppState;
use crate::types::Window;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(dashboard))
        .route("/api/v1/health", get(health))
        .route("/api/v1/movers/:window", get(window_movers))
        .route("/api/v1/combined", get(combined_movers))
        .route("/api/v1/errors", get(recent_errors))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Dashboard
// =============================================================================

async fn dashboard() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    uptime_secs: u64,
    universe_size: usize,
    last_scan: Option<String>,
    recent_error_count: usize,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        universe_size: state.symbol_universe.read().len(),
        last_scan: state.rankings.last_scan().map(|ts| ts.to_rfc3339()),
        recent_error_count: state.recent_errors.read().len(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Rankings
// =============================================================================

async fn window_movers(
    State(state): State<Arc<AppState>>,
    Path(window): Path<String>,
) -> impl IntoResponse {
    match Window::from_str(&window) {
        Ok(window) => {
            let ranking = state.rankings.window_ranking(window);
            Json(ranking.as_ref().clone()).into_response()
        }
        Err(e) => {
            let body = serde_json::json!({ "error": e.to_string() });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}

async fn combined_movers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ranking = state.rankings.combined_ranking();
    Json(ranking.as_ref().clone())
}

// =============================================================================
// Errors
// =============================================================================

async fn recent_errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}
