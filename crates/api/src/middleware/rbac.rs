//! Permission-gated extractors.
//!
//! Each wraps [`AuthUser`] and rejects with 403 when the access token does
//! not carry the permission code. Permissions are the ones pushed into the
//! token at login or the last refresh.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use warden_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// May revoke other users' sessions.
pub const PERM_SESSION_REVOKE: &str = "session:revoke";
/// May inspect and clear account lockouts.
pub const PERM_ACCOUNT_UNLOCK: &str = "account:unlock";

fn require(user: AuthUser, permission: &str) -> Result<AuthUser, AppError> {
    if user.claims.has_permission(permission) {
        Ok(user)
    } else {
        tracing::debug!(user_id = user.user_id, permission, "Permission denied");
        Err(AppError::Core(CoreError::Forbidden(format!(
            "Permission '{permission}' required"
        ))))
    }
}

/// Requires [`PERM_SESSION_REVOKE`].
///
/// ```ignore
/// async fn kick(RequireSessionAdmin(admin): RequireSessionAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireSessionAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireSessionAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require(user, PERM_SESSION_REVOKE).map(RequireSessionAdmin)
    }
}

/// Requires [`PERM_ACCOUNT_UNLOCK`].
pub struct RequireAccountAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAccountAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require(user, PERM_ACCOUNT_UNLOCK).map(RequireAccountAdmin)
    }
}
