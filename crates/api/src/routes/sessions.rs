//! Route definitions for the caller's own sessions, mounted under `/auth`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// ```text
/// GET    /sessions                -> list
/// POST   /sessions/logout-others  -> logout_others
/// DELETE /sessions/{id}           -> revoke
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(sessions::list))
        .route("/sessions/logout-others", post(sessions::logout_others))
        .route("/sessions/{id}", delete(sessions::revoke))
}
