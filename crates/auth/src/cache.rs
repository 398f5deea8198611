//! Fast-lookup caches in the key-value store.
//!
//! [`SessionCache`] mirrors `refresh digest -> session id` so the refresh path
//! can go straight to the row. [`RbacCache`] holds a user's current role and
//! permission codes for collaborators that authorize without decoding tokens.
//! Neither is a source of truth: a miss or a failure falls back to the store.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_core::error::StoreError;
use warden_core::kv::KvStore;
use warden_core::session::Session;
use warden_core::timeout::bounded;
use warden_core::types::{DbId, SessionId, Timestamp};

use crate::registry::remaining;

/// Cached pointer from a refresh-token digest to its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub session_id: SessionId,
    pub user_id: DbId,
    pub expires_at: Timestamp,
}

#[derive(Clone)]
pub struct SessionCache {
    kv: Arc<dyn KvStore>,
    timeout: Duration,
}

impl SessionCache {
    pub fn new(kv: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self { kv, timeout }
    }

    fn key(refresh_hash: &str) -> String {
        format!("session:rt:{refresh_hash}")
    }

    /// Mirror `session` until its refresh token expires.
    pub async fn put(&self, session: &Session, now: Timestamp) -> Result<(), StoreError> {
        let ttl = remaining(session.expires_at, now);
        if ttl.is_zero() {
            return Ok(());
        }
        let entry = CachedSession {
            session_id: session.id,
            user_id: session.user_id,
            expires_at: session.expires_at,
        };
        let value = serde_json::to_string(&entry)?;
        bounded(
            self.timeout,
            self.kv.set_ex(&Self::key(&session.refresh_token_hash), &value, ttl),
        )
        .await
    }

    pub async fn get(&self, refresh_hash: &str) -> Result<Option<CachedSession>, StoreError> {
        let raw = bounded(self.timeout, self.kv.get(&Self::key(refresh_hash))).await?;
        Ok(raw.map(|v| serde_json::from_str(&v)).transpose()?)
    }

    pub async fn evict(&self, refresh_hash: &str) -> Result<(), StoreError> {
        bounded(self.timeout, self.kv.delete(&Self::key(refresh_hash))).await
    }
}

/// A user's role and permission codes as last pushed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacEntry {
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Clone)]
pub struct RbacCache {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
    timeout: Duration,
}

impl RbacCache {
    /// `ttl` should cover a refresh cycle; entries are re-pushed on every refresh.
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration, timeout: Duration) -> Self {
        Self { kv, ttl, timeout }
    }

    fn key(user_id: DbId) -> String {
        format!("rbac:{user_id}")
    }

    pub async fn put(&self, user_id: DbId, entry: &RbacEntry) -> Result<(), StoreError> {
        let value = serde_json::to_string(entry)?;
        bounded(
            self.timeout,
            self.kv.set_ex(&Self::key(user_id), &value, self.ttl),
        )
        .await
    }

    pub async fn get(&self, user_id: DbId) -> Result<Option<RbacEntry>, StoreError> {
        let raw = bounded(self.timeout, self.kv.get(&Self::key(user_id))).await?;
        Ok(raw.map(|v| serde_json::from_str(&v)).transpose()?)
    }

    pub async fn clear(&self, user_id: DbId) -> Result<(), StoreError> {
        bounded(self.timeout, self.kv.delete(&Self::key(user_id))).await
    }
}
