//! Revocation registry.
//!
//! Maps a token digest to the reason it was revoked, with a TTL equal to the
//! token's remaining lifetime so entries vanish once the token would have
//! expired anyway. Lives in the key-value store, never the session store.

use std::sync::Arc;
use std::time::Duration;

use warden_core::error::StoreError;
use warden_core::hashing::token_digest;
use warden_core::kv::KvStore;
use warden_core::revocation::RevocationReason;
use warden_core::timeout::bounded;
use warden_core::types::Timestamp;

const KEY_PREFIX: &str = "blacklist";

fn key(digest: &str) -> String {
    format!("{KEY_PREFIX}:{digest}")
}

/// Time left until `until`, zero when already past.
pub fn remaining(until: Timestamp, now: Timestamp) -> Duration {
    (until - now).to_std().unwrap_or(Duration::ZERO)
}

#[derive(Clone)]
pub struct RevocationRegistry {
    kv: Arc<dyn KvStore>,
    timeout: Duration,
}

impl RevocationRegistry {
    pub fn new(kv: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self { kv, timeout }
    }

    /// Blacklist `token` for `ttl`. Re-blacklisting overwrites the reason.
    pub async fn blacklist(
        &self,
        token: &str,
        ttl: Duration,
        reason: RevocationReason,
    ) -> Result<(), StoreError> {
        self.blacklist_digest(&token_digest(token), ttl, reason).await
    }

    /// Blacklist by digest, for tokens known only from a session row.
    ///
    /// A zero `ttl` means the token has already expired; nothing is written.
    pub async fn blacklist_digest(
        &self,
        digest: &str,
        ttl: Duration,
        reason: RevocationReason,
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        bounded(self.timeout, self.kv.set_ex(&key(digest), reason.code(), ttl)).await
    }

    /// Why `token` was revoked, or `None` if it was not.
    pub async fn reason_for(&self, token: &str) -> Result<Option<RevocationReason>, StoreError> {
        let stored = bounded(self.timeout, self.kv.get(&key(&token_digest(token)))).await?;
        stored
            .map(|code| {
                code.parse()
                    .map_err(|e: String| StoreError::Serialization(e))
            })
            .transpose()
    }
}
