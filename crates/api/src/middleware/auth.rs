//! Access-token authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use warden_auth::{Authenticated, Claims};
use warden_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a Bearer token in the `Authorization` header.
///
/// The token must verify and must not be in the revocation registry.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's id (from `claims.sub`).
    pub user_id: DbId,
    pub claims: Claims,
    /// The raw access token, which identifies the caller's session.
    pub token: String,
}

impl From<Authenticated> for AuthUser {
    fn from(auth: Authenticated) -> Self {
        Self {
            user_id: auth.claims.sub,
            claims: auth.claims,
            token: auth.token,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = authorization(parts);
        let auth = state.guard.authenticate(header).await?;
        Ok(auth.into())
    }
}

/// Caller identified by signature and expiry alone, even if the token was
/// already revoked. Only for logout.
#[derive(Debug, Clone)]
pub struct TokenHolder(pub AuthUser);

impl FromRequestParts<AppState> for TokenHolder {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = state.guard.identify(authorization(parts))?;
        Ok(TokenHolder(auth.into()))
    }
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}
