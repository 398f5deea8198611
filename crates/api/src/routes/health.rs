use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use warden_core::timeout::bounded;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub session_store_healthy: bool,
    pub kv_healthy: bool,
}

/// GET /health -- returns service, session store and key-value store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let timeout = state.config.auth.store_timeout;
    let (sessions, kv) = tokio::join!(
        bounded(timeout, state.sessions.health_check()),
        bounded(timeout, state.kv.ping()),
    );

    if let Err(e) = &sessions {
        tracing::warn!(error = %e, "Session store health check failed");
    }
    if let Err(e) = &kv {
        tracing::warn!(error = %e, "Key-value store health check failed");
    }

    let session_store_healthy = sessions.is_ok();
    let kv_healthy = kv.is_ok();
    let status = if session_store_healthy && kv_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        session_store_healthy,
        kv_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
