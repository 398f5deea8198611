use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use warden_auth::AuthError;
use warden_core::error::{CoreError, ErrorKind, Locale};
use warden_core::revocation::RevocationReason;

/// Application-level error type for HTTP handlers.
///
/// Authentication failures render as `{code, message}` with HTTP 401 and the
/// stable [`ErrorKind`] code; everything else uses the generic codes below.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure from the session core.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A domain-level error from `warden_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Stored revocation reason when the token was revoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RevocationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Attached to the extensions of every 401 response so the locale
/// middleware can re-render the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFailure {
    pub kind: ErrorKind,
    pub reason: Option<RevocationReason>,
    pub retry_after_secs: Option<u64>,
}

impl AuthFailure {
    fn from_error(err: &AuthError) -> Option<Self> {
        let kind = err.kind()?;
        let (reason, retry_after_secs) = match err {
            AuthError::Revoked(reason) => (Some(*reason), None),
            AuthError::Locked { remaining_secs } => (None, Some(*remaining_secs)),
            _ => (None, None),
        };
        Some(Self {
            kind,
            reason,
            retry_after_secs,
        })
    }

    pub fn body(&self, locale: Locale) -> ErrorBody {
        ErrorBody {
            code: self.kind.code().to_string(),
            message: self.kind.message(locale).to_string(),
            reason: self.reason,
            retry_after_secs: self.retry_after_secs,
        }
    }

    /// Render as a 401 response in `locale`.
    pub fn into_response(self, locale: Locale) -> Response {
        let mut response = (StatusCode::UNAUTHORIZED, axum::Json(self.body(locale))).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(err) => {
                if let Some(failure) = AuthFailure::from_error(err) {
                    return failure.into_response(Locale::default());
                }
                match err {
                    AuthError::SessionNotFound => (
                        StatusCode::NOT_FOUND,
                        "SESSION_NOT_FOUND",
                        "Session not found".to_string(),
                    ),
                    other => {
                        tracing::error!(error = %other, "Session core failure");
                        internal()
                    }
                }
            }

            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = ErrorBody {
            code: code.to_string(),
            message,
            reason: None,
            retry_after_secs: None,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
