pub mod admin;
pub mod auth;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                              login (public)
/// /auth/refresh                            refresh (public)
/// /auth/logout                             logout (bearer token)
///
/// /auth/sessions                           list own sessions
/// /auth/sessions/logout-others             end all other sessions (POST)
/// /auth/sessions/{id}                      end one own session (DELETE)
///
/// /admin/users/{id}/sessions               revoke all (session:revoke)
/// /admin/users/{id}/sessions/{sid}         revoke one (session:revoke)
/// /admin/users/{id}/lockout                lock status (account:unlock)
/// /admin/users/{id}/unlock                 clear lock (account:unlock)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router().merge(sessions::router()))
        .nest("/admin", admin::router())
}
