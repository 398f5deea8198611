//! Administrative handlers under `/admin/users/{id}`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use warden_auth::LockStatus;
use warden_core::revocation::RevocationReason;
use warden_core::types::{DbId, SessionId};

use super::sessions::{RevokedSession, RevokedSessions};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAccountAdmin, RequireSessionAdmin};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RevokeParams {
    /// Defaults to `ADMIN_REVOKED`.
    pub reason: Option<RevocationReason>,
}

/// Reasons an administrator may record. The rest are set by the system.
fn admin_reason(params: &RevokeParams) -> Result<RevocationReason, AppError> {
    match params.reason.unwrap_or(RevocationReason::AdminRevoked) {
        reason @ (RevocationReason::AdminRevoked
        | RevocationReason::PasswordChanged
        | RevocationReason::SecurityIncident) => Ok(reason),
        other => Err(AppError::BadRequest(format!(
            "reason {other} cannot be set by an administrator"
        ))),
    }
}

/// DELETE /api/v1/admin/users/{id}/sessions
pub async fn revoke_all(
    State(state): State<AppState>,
    RequireSessionAdmin(admin): RequireSessionAdmin,
    Path(user_id): Path<DbId>,
    Query(params): Query<RevokeParams>,
) -> AppResult<Json<RevokedSessions>> {
    let reason = admin_reason(&params)?;
    let revoked = state
        .lifecycle
        .revoke_all(user_id, reason, Some(admin.user_id))
        .await?;
    tracing::info!(
        admin_id = admin.user_id,
        user_id,
        revoked = revoked.len(),
        "Admin revoked all sessions"
    );
    Ok(Json(RevokedSessions { revoked }))
}

/// DELETE /api/v1/admin/users/{id}/sessions/{sid}
pub async fn revoke_one(
    State(state): State<AppState>,
    RequireSessionAdmin(admin): RequireSessionAdmin,
    Path((user_id, session_id)): Path<(DbId, SessionId)>,
    Query(params): Query<RevokeParams>,
) -> AppResult<Json<RevokedSession>> {
    let reason = admin_reason(&params)?;
    let revoked = state
        .lifecycle
        .revoke_one(user_id, session_id, reason, Some(admin.user_id))
        .await?;
    Ok(Json(RevokedSession { revoked }))
}

/// GET /api/v1/admin/users/{id}/lockout
pub async fn lockout_status(
    State(state): State<AppState>,
    RequireAccountAdmin(_admin): RequireAccountAdmin,
    Path(user_id): Path<DbId>,
) -> Json<LockStatus> {
    Json(state.credentials.lock_status(user_id).await)
}

/// POST /api/v1/admin/users/{id}/unlock
pub async fn unlock(
    State(state): State<AppState>,
    RequireAccountAdmin(admin): RequireAccountAdmin,
    Path(user_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.credentials.unlock(user_id, admin.user_id).await?;
    tracing::info!(admin_id = admin.user_id, user_id, "Account unlocked");
    Ok(StatusCode::NO_CONTENT)
}
