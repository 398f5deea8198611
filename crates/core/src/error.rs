use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a session store or key-value backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend returned an error (connection refused, query failed, ...).
    #[error("Store backend error: {0}")]
    Backend(String),

    /// The call did not complete within the caller-supplied timeout.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// A cached value could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Closed set of authentication failure kinds surfaced to clients.
///
/// Every kind maps to HTTP 401 at the boundary. The wire code is stable; the
/// human-readable message comes from [`ErrorKind::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    TokenExpired,
    TokenMalformed,
    /// Signed correctly, but its `nbf` is still in the future.
    TokenNotYetValid,
    TokenInvalidSignature,
    TokenMissing,
    /// The token could not be checked because a backing store failed or timed out.
    TokenUnverifiable,
    RefreshTokenInvalid,
    AccountDisabled,
    SessionExpired,
    SessionRevoked,
    MaxSessionsExceeded,
    AccountLocked,
    InvalidCredentials,
}

/// Message languages supported by the message table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Pick a locale from an `Accept-Language` header value.
    ///
    /// Only the first language range is considered; anything that is not
    /// Chinese falls back to English.
    pub fn from_accept_language(header: &str) -> Self {
        let first = header
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if first.starts_with("zh") {
            Locale::Zh
        } else {
            Locale::En
        }
    }
}

impl ErrorKind {
    /// Stable wire code, e.g. `"TOKEN_EXPIRED"`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::TokenExpired => "TOKEN_EXPIRED",
            ErrorKind::TokenMalformed => "TOKEN_MALFORMED",
            ErrorKind::TokenNotYetValid => "TOKEN_NOT_YET_VALID",
            ErrorKind::TokenInvalidSignature => "TOKEN_INVALID_SIGNATURE",
            ErrorKind::TokenMissing => "TOKEN_MISSING",
            ErrorKind::TokenUnverifiable => "TOKEN_UNVERIFIABLE",
            ErrorKind::RefreshTokenInvalid => "REFRESH_TOKEN_INVALID",
            ErrorKind::AccountDisabled => "ACCOUNT_DISABLED",
            ErrorKind::SessionExpired => "SESSION_EXPIRED",
            ErrorKind::SessionRevoked => "SESSION_REVOKED",
            ErrorKind::MaxSessionsExceeded => "MAX_SESSIONS_EXCEEDED",
            ErrorKind::AccountLocked => "ACCOUNT_LOCKED",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }

    /// Localized, client-facing message.
    pub fn message(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => match self {
                ErrorKind::TokenExpired => "Access token has expired",
                ErrorKind::TokenMalformed => "Access token is malformed",
                ErrorKind::TokenNotYetValid => "Access token is not valid yet",
                ErrorKind::TokenInvalidSignature => "Access token signature is invalid",
                ErrorKind::TokenMissing => "Authorization token is missing",
                ErrorKind::TokenUnverifiable => "Access token could not be verified, try again",
                ErrorKind::RefreshTokenInvalid => "Refresh token is invalid or expired",
                ErrorKind::AccountDisabled => "Account is disabled",
                ErrorKind::SessionExpired => "Session was renewed elsewhere, please sign in again",
                ErrorKind::SessionRevoked => "Session has been revoked",
                ErrorKind::MaxSessionsExceeded => {
                    "Signed out because the account was used on too many devices"
                }
                ErrorKind::AccountLocked => "Account is temporarily locked",
                ErrorKind::InvalidCredentials => "Invalid username or password",
            },
            Locale::Zh => match self {
                ErrorKind::TokenExpired => "访问令牌已过期",
                ErrorKind::TokenMalformed => "访问令牌格式错误",
                ErrorKind::TokenNotYetValid => "访问令牌尚未生效",
                ErrorKind::TokenInvalidSignature => "访问令牌签名无效",
                ErrorKind::TokenMissing => "缺少认证令牌",
                ErrorKind::TokenUnverifiable => "暂时无法校验令牌，请稍后重试",
                ErrorKind::RefreshTokenInvalid => "刷新令牌无效或已过期",
                ErrorKind::AccountDisabled => "账号已被禁用",
                ErrorKind::SessionExpired => "会话已在其他位置续期，请重新登录",
                ErrorKind::SessionRevoked => "会话已被撤销",
                ErrorKind::MaxSessionsExceeded => "登录设备数超出上限，您已被迫下线",
                ErrorKind::AccountLocked => "账号已被临时锁定",
                ErrorKind::InvalidCredentials => "用户名或密码错误",
            },
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
