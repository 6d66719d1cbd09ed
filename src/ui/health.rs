//! Health and readiness endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use super::UiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Listener readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub is_ready: bool,
    pub is_listening: bool,
    pub voice_enabled: bool,
    pub database: CheckResult,
}

/// Result of a single check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response to an explicit readiness signal
#[derive(Serialize)]
pub struct SignalResponse {
    /// Whether this call opened the gate
    pub opened: bool,
}

/// Liveness check
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check: has the frontend signalled, and is the store reachable?
async fn ready(State(state): State<Arc<UiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let listener = state.gate.state();

    let database = match state.store.ping() {
        Ok(()) => CheckResult {
            status: "ok",
            message: None,
        },
        Err(e) => CheckResult {
            status: "fail",
            message: Some(e.to_string()),
        },
    };

    let all_ok = listener.is_ready && database.status == "ok";
    let (status, http_status) = if all_ok {
        ("ok", StatusCode::OK)
    } else {
        ("waiting", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            is_ready: listener.is_ready,
            is_listening: listener.is_listening,
            voice_enabled: state.voice_enabled,
            database,
        }),
    )
}

/// Same as the `frontend_ready` WebSocket message
async fn signal_ready(State(state): State<Arc<UiState>>) -> Json<SignalResponse> {
    Json(SignalResponse {
        opened: state.gate.signal_ready(),
    })
}

/// Build health and readiness router
pub fn router(state: Arc<UiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/ready", post(signal_ready))
        .with_state(state)
}
