//! Concurrent session limiter.
//!
//! Runs during login, before the new session is persisted. The cap is enforced
//! by evicting the oldest sessions, never by rejecting the login. Two logins
//! racing for the same user may each evict one session; the cap is never
//! under-enforced.

use std::sync::Arc;
use std::time::Duration;

use warden_core::error::StoreError;
use warden_core::revocation::RevocationReason;
use warden_core::session::{Session, SessionStore};
use warden_core::timeout::bounded;
use warden_core::types::{DbId, Timestamp};

use crate::terminate::SessionTerminator;

#[derive(Clone)]
pub struct SessionLimiter {
    sessions: Arc<dyn SessionStore>,
    terminator: SessionTerminator,
    max_sessions: usize,
    timeout: Duration,
}

impl SessionLimiter {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        terminator: SessionTerminator,
        max_sessions: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            terminator,
            max_sessions,
            timeout,
        }
    }

    /// Make room for one more session for `user_id`.
    ///
    /// Returns the evicted sessions, oldest first.
    pub async fn enforce(&self, user_id: DbId, now: Timestamp) -> Result<Vec<Session>, StoreError> {
        let active = bounded(self.timeout, self.sessions.list_active(user_id, now)).await?;
        if active.len() < self.max_sessions {
            return Ok(Vec::new());
        }

        let excess = active.len() - self.max_sessions + 1;
        let mut evicted = Vec::with_capacity(excess);
        for session in active.into_iter().take(excess) {
            self.terminator
                .terminate(&session, RevocationReason::MaxSessionsExceeded, now)
                .await?;
            evicted.push(session);
        }

        tracing::info!(
            user_id,
            evicted = evicted.len(),
            cap = self.max_sessions,
            "Evicted oldest sessions over the concurrent session cap"
        );
        Ok(evicted)
    }
}
