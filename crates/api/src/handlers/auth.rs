//! Handlers for the `/auth` resource (login, refresh, logout).

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use warden_auth::TokenPair;
use warden_core::identity::VerifiedIdentity;
use warden_core::session::DeviceInfo;
use warden_core::types::{DbId, SessionId};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::TokenHolder;
use crate::state::AppState;

/// Longest `User-Agent` kept as a device label.
const MAX_DEVICE_LABEL_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserInfo,
}

/// Public user info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<VerifiedIdentity> for UserInfo {
    fn from(identity: VerifiedIdentity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            email: identity.email,
            roles: identity.role_codes,
            permissions: identity.permission_codes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// `false` when the session had already ended.
    pub logged_out: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".into(),
        ));
    }

    let identity = state
        .credentials
        .verify(input.username.trim(), &input.password)
        .await?;
    let outcome = state
        .lifecycle
        .login(&identity, device_info(&headers))
        .await?;

    Ok(Json(AuthResponse {
        session_id: outcome.session_id,
        tokens: outcome.tokens,
        user: outcome.profile.into(),
    }))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. Every failure answers
/// `REFRESH_TOKEN_INVALID`.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let outcome = state.lifecycle.refresh(&input.refresh_token).await?;
    Ok(Json(AuthResponse {
        session_id: outcome.session_id,
        tokens: outcome.tokens,
        user: outcome.profile.into(),
    }))
}

/// POST /api/v1/auth/logout
///
/// End the caller's session. Repeating it with the same token succeeds.
pub async fn logout(
    State(state): State<AppState>,
    TokenHolder(user): TokenHolder,
) -> AppResult<Json<LogoutResponse>> {
    let logged_out = state.lifecycle.logout(user.user_id, &user.token).await?;
    Ok(Json(LogoutResponse { logged_out }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Device label from `User-Agent`, client address from the proxy headers.
pub fn device_info(headers: &HeaderMap) -> DeviceInfo {
    let label = header_str(headers, USER_AGENT.as_str())
        .map(|ua| ua.chars().take(MAX_DEVICE_LABEL_LEN).collect::<String>());

    let ip_address = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_string);

    DeviceInfo { label, ip_address }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn device_info_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));

        let device = device_info(&headers);
        assert_eq!(device.label.as_deref(), Some("curl/8.0"));
        assert_eq!(device.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn device_info_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        let device = device_info(&headers);
        assert_eq!(device.label, None);
        assert_eq!(device.ip_address.as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn long_user_agent_is_truncated() {
        let mut headers = HeaderMap::new();
        let ua = "x".repeat(1000);
        headers.insert(USER_AGENT, HeaderValue::from_str(&ua).unwrap());
        assert_eq!(device_info(&headers).label.unwrap().len(), MAX_DEVICE_LABEL_LEN);
    }
}
