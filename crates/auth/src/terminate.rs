//! Shared "blacklist both tokens, then revoke the row" step.
//!
//! Every revocation edge of the session state machine (logout, logout-others,
//! revoke-all, revoke-one, eviction) ends a session the same way.

use std::sync::Arc;
use std::time::Duration;

use warden_core::error::StoreError;
use warden_core::revocation::RevocationReason;
use warden_core::session::{Session, SessionStore};
use warden_core::timeout::bounded;
use warden_core::types::Timestamp;

use crate::registry::{remaining, RevocationRegistry};

#[derive(Clone)]
pub struct SessionTerminator {
    sessions: Arc<dyn SessionStore>,
    registry: RevocationRegistry,
    timeout: Duration,
}

impl SessionTerminator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        registry: RevocationRegistry,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            registry,
            timeout,
        }
    }

    /// Blacklist the session's access and refresh tokens for their remaining
    /// lifetimes, then mark the row revoked.
    ///
    /// `session` may be a stale snapshot: if a refresh rotated the row in the
    /// meantime, the digests the row held when it was revoked are blacklisted
    /// too. Returns `false` when the row had already been revoked; the
    /// snapshot's tokens are blacklisted either way.
    pub async fn terminate(
        &self,
        session: &Session,
        reason: RevocationReason,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        self.blacklist_pair(session, reason, now).await?;

        let revoked = bounded(self.timeout, self.sessions.revoke(session.id, reason, now)).await?;
        if let Some(row) = &revoked {
            if row.access_token_hash != session.access_token_hash
                || row.refresh_token_hash != session.refresh_token_hash
            {
                tracing::debug!(
                    session_id = %session.id,
                    "Session rotated before revocation; blacklisting the newer pair"
                );
                self.blacklist_pair(row, reason, now).await?;
            }
        }

        tracing::debug!(
            session_id = %session.id,
            user_id = session.user_id,
            reason = %reason,
            revoked = revoked.is_some(),
            "Session terminated"
        );
        Ok(revoked.is_some())
    }

    async fn blacklist_pair(
        &self,
        session: &Session,
        reason: RevocationReason,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        self.registry
            .blacklist_digest(
                &session.access_token_hash,
                remaining(session.access_expires_at, now),
                reason,
            )
            .await?;
        self.registry
            .blacklist_digest(
                &session.refresh_token_hash,
                remaining(session.expires_at, now),
                reason,
            )
            .await
    }
}
