//! Route definitions for the `/admin` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// DELETE /users/{id}/sessions        -> revoke_all
/// DELETE /users/{id}/sessions/{sid}  -> revoke_one
/// GET    /users/{id}/lockout         -> lockout_status
/// POST   /users/{id}/unlock          -> unlock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/sessions", delete(admin::revoke_all))
        .route("/users/{id}/sessions/{sid}", delete(admin::revoke_one))
        .route("/users/{id}/lockout", get(admin::lockout_status))
        .route("/users/{id}/unlock", post(admin::unlock))
}
