//! Key-value seam shared by the revocation registry, the lockout counter and
//! the fast-lookup caches.
//!
//! Every mutation is an independent per-key upsert; no cross-key transaction
//! is ever required. Expired keys behave exactly like absent keys.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Upsert `key` with a time-to-live, replacing value and TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Current value of `key`, if present.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increment an integer counter and return the new value.
    ///
    /// A counter created by this call gets `ttl`; an existing counter keeps
    /// its remaining lifetime.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Remaining lifetime of `key`, or `None` when absent.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Backend liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
