//! Handlers for the caller's own sessions under `/auth/sessions`.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use warden_auth::{AuthError, SessionView};
use warden_core::revocation::RevocationReason;
use warden_core::types::SessionId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Sessions ended by a bulk operation.
#[derive(Debug, Serialize)]
pub struct RevokedSessions {
    pub revoked: Vec<SessionId>,
}

#[derive(Debug, Serialize)]
pub struct RevokedSession {
    /// `false` when the session had already ended.
    pub revoked: bool,
}

/// GET /api/v1/auth/sessions
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionView>>>> {
    let sessions = state
        .lifecycle
        .list_sessions(user.user_id, Some(&user.token))
        .await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// POST /api/v1/auth/sessions/logout-others
///
/// End every session of the caller except the one making the request.
pub async fn logout_others(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<RevokedSessions>> {
    let current = state
        .lifecycle
        .current_session(user.user_id, &user.token)
        .await?
        .ok_or(AuthError::SessionNotFound)?;
    let revoked = state
        .lifecycle
        .logout_others(user.user_id, current.id)
        .await?;
    Ok(Json(RevokedSessions { revoked }))
}

/// DELETE /api/v1/auth/sessions/{id}
///
/// End one of the caller's sessions, e.g. a lost device.
pub async fn revoke(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<SessionId>,
) -> AppResult<Json<RevokedSession>> {
    let current = state
        .lifecycle
        .current_session(user.user_id, &user.token)
        .await?;
    let reason = if current.is_some_and(|s| s.id == session_id) {
        RevocationReason::UserLogout
    } else {
        RevocationReason::LoggedOutElsewhere
    };

    let revoked = state
        .lifecycle
        .revoke_one(user.user_id, session_id, reason, Some(user.user_id))
        .await?;
    Ok(Json(RevokedSession { revoked }))
}
