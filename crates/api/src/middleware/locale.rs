//! Localises authentication error messages from `Accept-Language`.
//!
//! Error responses are rendered in English by [`AppError`](crate::error::AppError);
//! this middleware re-renders the body when the caller asked for another
//! supported language. Status, headers and wire code are untouched.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_LENGTH};
use axum::middleware::Next;
use axum::response::Response;
use warden_core::error::Locale;

use crate::error::AuthFailure;

pub async fn localize(request: Request, next: Next) -> Response {
    let locale = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(Locale::from_accept_language)
        .unwrap_or_default();

    let response = next.run(request).await;
    if locale == Locale::default() {
        return response;
    }
    let Some(failure) = response.extensions().get::<AuthFailure>().copied() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    match serde_json::to_vec(&failure.body(locale)) {
        Ok(bytes) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to localise error body");
            failure.into_response(Locale::default())
        }
    }
}
