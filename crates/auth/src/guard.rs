//! Bearer-token authentication for protected requests.
//!
//! Order matters: the revocation registry is consulted before the signature,
//! so a structurally valid, unexpired token that was revoked is still
//! rejected, with the reason it was revoked for.

use std::sync::Arc;

use warden_core::error::ErrorKind;
use warden_events::bus::{AuthEvent, EventBus, ACCESS_REJECTED};

use crate::error::AuthError;
use crate::jwt::{Claims, TokenCodec, TokenPurpose};
use crate::registry::RevocationRegistry;

/// A request whose access token passed every check.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub claims: Claims,
    /// The raw bearer token, needed to log this session out.
    pub token: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[derive(Clone)]
pub struct AccessGuard {
    codec: Arc<TokenCodec>,
    registry: RevocationRegistry,
    events: Arc<EventBus>,
}

impl AccessGuard {
    pub fn new(codec: Arc<TokenCodec>, registry: RevocationRegistry, events: Arc<EventBus>) -> Self {
        Self {
            codec,
            registry,
            events,
        }
    }

    /// Authenticate the raw `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Authenticated, AuthError> {
        let result = self.check(header).await;
        if let Err(err) = &result {
            self.events.publish(
                AuthEvent::new(ACCESS_REJECTED).with_payload(serde_json::json!({
                    "code": err.kind().map(ErrorKind::code),
                })),
            );
        }
        result
    }

    /// Verify the token's signature and expiry without consulting the
    /// registry.
    ///
    /// For convergent operations such as logout, where a token that was
    /// already revoked must still identify its owner.
    pub fn identify(&self, header: Option<&str>) -> Result<Authenticated, AuthError> {
        let token = header
            .and_then(bearer_token)
            .ok_or(AuthError::Rejected(ErrorKind::TokenMissing))?;
        let claims = self
            .codec
            .verify(token, TokenPurpose::Access)
            .map_err(|e| AuthError::Rejected(e.kind()))?;
        Ok(Authenticated {
            claims,
            token: token.to_string(),
        })
    }

    async fn check(&self, header: Option<&str>) -> Result<Authenticated, AuthError> {
        let token = header
            .and_then(bearer_token)
            .ok_or(AuthError::Rejected(ErrorKind::TokenMissing))?;

        match self.registry.reason_for(token).await {
            Ok(Some(reason)) => return Err(AuthError::Revoked(reason)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Revocation registry unavailable, rejecting token");
                return Err(AuthError::Rejected(ErrorKind::TokenUnverifiable));
            }
        }

        let claims = self
            .codec
            .verify(token, TokenPurpose::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::Rejected(e.kind())
            })?;

        Ok(Authenticated {
            claims,
            token: token.to_string(),
        })
    }
}
