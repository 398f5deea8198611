//! In-process key-value store with per-key expiry.
//!
//! Expiry uses [`tokio::time::Instant`], so tests can drive it with a paused
//! clock and `tokio::time::advance`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use warden_core::error::StoreError;
use warden_core::kv::KvStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// `RwLock<HashMap>`-backed [`KvStore`].
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Backend`] until cleared.
    ///
    /// Used to exercise outage handling.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Periodically purge expired entries until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let kv = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = kv.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired in-memory cache entries");
                }
            }
        })
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("in-memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available()?;
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                let current: i64 = entry.value.parse().map_err(|_| {
                    StoreError::Backend(format!("value at '{key}' is not an integer"))
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".into(),
                        expires_at: now + ttl,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at - now))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let kv = MemoryKv::new();
        kv.set_ex("k", "v", Duration::from_secs(10)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(kv.ttl("k").await.unwrap(), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(kv.ttl("k").await.unwrap(), Some(Duration::from_secs(6)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert_eq!(kv.ttl("k").await.unwrap(), None);
        assert_eq!(kv.purge_expired().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn incr_keeps_ttl_of_existing_counter() {
        let kv = MemoryKv::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(kv.incr_with_ttl("c", ttl).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(kv.incr_with_ttl("c", ttl).await.unwrap(), 2);
        assert_eq!(kv.ttl("c").await.unwrap(), Some(Duration::from_secs(30)));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(kv.incr_with_ttl("c", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let kv = Arc::new(MemoryKv::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let kv = Arc::clone(&kv);
            handles.push(tokio::spawn(async move {
                kv.incr_with_ttl("c", Duration::from_secs(60)).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(kv.get("c").await.unwrap().as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let kv = MemoryKv::new();
        kv.set_unavailable(true);
        assert!(kv.get("k").await.is_err());
        assert!(kv.ping().await.is_err());
        kv.set_unavailable(false);
        assert!(kv.ping().await.is_ok());
    }

    #[tokio::test]
    async fn delete_of_absent_key_is_ok() {
        let kv = MemoryKv::new();
        kv.delete("missing").await.unwrap();
    }
}
