//! Account lockout counter.
//!
//! Two keys per user: a failure counter (`lockout:count:{id}`) whose TTL is
//! the longest lockout plus a buffer, and a lock flag (`lockout:lock:{id}`)
//! whose TTL is the active lockout duration. Counting is frozen while the
//! flag is present, and the counter is zeroed the moment a lock is applied.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use warden_core::error::StoreError;
use warden_core::kv::KvStore;
use warden_core::lockout::{LockoutFailurePolicy, LockoutPolicy};
use warden_core::timeout::bounded;
use warden_core::types::DbId;

/// Result of recording one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Counter value after this call.
    pub count: u32,
    /// Remaining lock time, if the account is locked after this call.
    pub locked_for: Option<Duration>,
    /// Whether this call applied the lock.
    pub newly_locked: bool,
}

/// Whether an account is currently locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<u64>,
}

impl LockStatus {
    const UNLOCKED: LockStatus = LockStatus {
        locked: false,
        remaining_secs: None,
    };

    fn locked_for(remaining: Duration) -> Self {
        LockStatus {
            locked: true,
            remaining_secs: Some(ceil_secs(remaining)),
        }
    }
}

/// Whole seconds, rounded up so a lock never reports 0 while still active.
fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[derive(Clone)]
pub struct LockoutCounter {
    kv: Arc<dyn KvStore>,
    policy: LockoutPolicy,
    on_store_failure: LockoutFailurePolicy,
    timeout: Duration,
}

impl LockoutCounter {
    pub fn new(
        kv: Arc<dyn KvStore>,
        policy: LockoutPolicy,
        on_store_failure: LockoutFailurePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            kv,
            policy,
            on_store_failure,
            timeout,
        }
    }

    fn count_key(user_id: DbId) -> String {
        format!("lockout:count:{user_id}")
    }

    fn lock_key(user_id: DbId) -> String {
        format!("lockout:lock:{user_id}")
    }

    /// Count a failed authentication for `user_id`.
    ///
    /// While locked, returns the frozen count without incrementing. Otherwise
    /// increments atomically and applies the highest tier the new count
    /// reaches, zeroing the counter.
    pub async fn record_failure(&self, user_id: DbId) -> Result<FailureOutcome, StoreError> {
        if let Some(remaining) = self.lock_remaining(user_id).await? {
            return Ok(FailureOutcome {
                count: self.current_count(user_id).await?,
                locked_for: Some(remaining),
                newly_locked: false,
            });
        }

        let count = bounded(
            self.timeout,
            self.kv
                .incr_with_ttl(&Self::count_key(user_id), self.policy.counter_ttl()),
        )
        .await?;
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        let Some(tier) = self.policy.tier_for(count) else {
            return Ok(FailureOutcome {
                count,
                locked_for: None,
                newly_locked: false,
            });
        };

        bounded(
            self.timeout,
            self.kv.set_ex(
                &Self::lock_key(user_id),
                &tier.attempts.to_string(),
                tier.duration,
            ),
        )
        .await?;
        bounded(self.timeout, self.kv.delete(&Self::count_key(user_id))).await?;

        tracing::warn!(
            user_id,
            attempts = count,
            lock_secs = tier.duration.as_secs(),
            "Account locked after repeated failed logins"
        );
        Ok(FailureOutcome {
            count: 0,
            locked_for: Some(tier.duration),
            newly_locked: true,
        })
    }

    /// Read the lock flag, applying the configured policy if the store fails.
    pub async fn check_locked(&self, user_id: DbId) -> LockStatus {
        match self.lock_remaining(user_id).await {
            Ok(Some(remaining)) => LockStatus::locked_for(remaining),
            Ok(None) => LockStatus::UNLOCKED,
            Err(e) => {
                tracing::warn!(
                    user_id,
                    error = %e,
                    policy = ?self.on_store_failure,
                    "Lockout store unavailable, applying configured failure policy"
                );
                match self.on_store_failure {
                    LockoutFailurePolicy::TreatAsUnlocked => LockStatus::UNLOCKED,
                    LockoutFailurePolicy::TreatAsLocked => LockStatus {
                        locked: true,
                        remaining_secs: None,
                    },
                }
            }
        }
    }

    /// Clear counter and lock after a successful authentication.
    pub async fn reset(&self, user_id: DbId) -> Result<(), StoreError> {
        self.clear(user_id).await
    }

    /// Administrative override; clears counter and lock.
    pub async fn unlock(&self, user_id: DbId) -> Result<(), StoreError> {
        self.clear(user_id).await?;
        tracing::info!(user_id, "Account unlocked by administrator");
        Ok(())
    }

    /// Current failure count (0 when absent).
    pub async fn current_count(&self, user_id: DbId) -> Result<u32, StoreError> {
        let raw = bounded(self.timeout, self.kv.get(&Self::count_key(user_id))).await?;
        match raw {
            None => Ok(0),
            Some(v) => v
                .parse()
                .map_err(|_| StoreError::Serialization(format!("lockout counter '{v}'"))),
        }
    }

    async fn lock_remaining(&self, user_id: DbId) -> Result<Option<Duration>, StoreError> {
        bounded(self.timeout, self.kv.ttl(&Self::lock_key(user_id))).await
    }

    async fn clear(&self, user_id: DbId) -> Result<(), StoreError> {
        bounded(self.timeout, self.kv.delete(&Self::count_key(user_id))).await?;
        bounded(self.timeout, self.kv.delete(&Self::lock_key(user_id))).await
    }
}

#[cfg(test)]
mod tests {
    use warden_cache::MemoryKv;
    use warden_core::lockout::{LockoutTier, DEFAULT_COUNTER_BUFFER};

    use super::*;

    fn counter(kv: Arc<MemoryKv>, on_failure: LockoutFailurePolicy) -> LockoutCounter {
        LockoutCounter::new(
            kv,
            LockoutPolicy::default(),
            on_failure,
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fifth_failure_locks_and_zeroes_counter() {
        let counter = counter(Arc::new(MemoryKv::new()), LockoutFailurePolicy::default());

        for expected in 1..=4 {
            let outcome = counter.record_failure(1).await.unwrap();
            assert_eq!(outcome.count, expected);
            assert_eq!(outcome.locked_for, None);
        }
        let outcome = counter.record_failure(1).await.unwrap();
        assert!(outcome.newly_locked);
        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.locked_for, Some(Duration::from_secs(15 * 60)));

        let status = counter.check_locked(1).await;
        assert!(status.locked);
        assert_eq!(status.remaining_secs, Some(900));
        assert_eq!(counter.current_count(1).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn counting_restarts_from_zero_after_lock_expires() {
        let counter = counter(Arc::new(MemoryKv::new()), LockoutFailurePolicy::default());
        for _ in 0..5 {
            counter.record_failure(1).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;
        assert!(!counter.check_locked(1).await.locked);

        let outcome = counter.record_failure(1).await.unwrap();
        assert_eq!(outcome.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_while_locked_are_frozen() {
        let counter = counter(Arc::new(MemoryKv::new()), LockoutFailurePolicy::default());
        for _ in 0..5 {
            counter.record_failure(1).await.unwrap();
        }
        let before = counter.check_locked(1).await;

        let outcome = counter.record_failure(1).await.unwrap();
        assert!(!outcome.newly_locked);
        assert_eq!(outcome.count, 0);
        assert_eq!(counter.check_locked(1).await, before);
        assert_eq!(counter.current_count(1).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn highest_tier_wins_when_thresholds_skipped() {
        let kv = Arc::new(MemoryKv::new());
        let policy = LockoutPolicy::new(
            vec![
                LockoutTier {
                    attempts: 2,
                    duration: Duration::from_secs(60),
                },
                LockoutTier {
                    attempts: 1,
                    duration: Duration::from_secs(10),
                },
            ],
            DEFAULT_COUNTER_BUFFER,
        )
        .unwrap();
        // Seed a counter past both thresholds, as if written by another node
        // before this policy was deployed.
        kv.set_ex("lockout:count:1", "4", Duration::from_secs(600))
            .await
            .unwrap();
        let counter = LockoutCounter::new(
            kv,
            policy,
            LockoutFailurePolicy::default(),
            Duration::from_millis(500),
        );

        let outcome = counter.record_failure(1).await.unwrap();
        assert_eq!(outcome.locked_for, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn users_are_counted_independently() {
        let counter = counter(Arc::new(MemoryKv::new()), LockoutFailurePolicy::default());
        counter.record_failure(1).await.unwrap();
        counter.record_failure(1).await.unwrap();
        counter.record_failure(2).await.unwrap();
        assert_eq!(counter.current_count(1).await.unwrap(), 2);
        assert_eq!(counter.current_count(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_failures_are_not_under_counted() {
        let kv = Arc::new(MemoryKv::new());
        let policy = LockoutPolicy::new(
            vec![LockoutTier {
                attempts: 100,
                duration: Duration::from_secs(60),
            }],
            DEFAULT_COUNTER_BUFFER,
        )
        .unwrap();
        let counter = LockoutCounter::new(
            kv,
            policy,
            LockoutFailurePolicy::default(),
            Duration::from_secs(5),
        );

        let mut handles = Vec::new();
        for _ in 0..20 {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                counter.record_failure(1).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.current_count(1).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn reset_and_unlock_clear_everything() {
        let counter = counter(Arc::new(MemoryKv::new()), LockoutFailurePolicy::default());
        for _ in 0..5 {
            counter.record_failure(1).await.unwrap();
        }
        counter.unlock(1).await.unwrap();
        assert!(!counter.check_locked(1).await.locked);

        counter.record_failure(1).await.unwrap();
        counter.reset(1).await.unwrap();
        assert_eq!(counter.current_count(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failure_follows_configured_policy() {
        let kv = Arc::new(MemoryKv::new());
        kv.set_unavailable(true);

        let open = counter(kv.clone(), LockoutFailurePolicy::TreatAsUnlocked);
        assert_eq!(open.check_locked(1).await, LockStatus::UNLOCKED);

        let closed = counter(kv.clone(), LockoutFailurePolicy::TreatAsLocked);
        let status = closed.check_locked(1).await;
        assert!(status.locked);
        assert_eq!(status.remaining_secs, None);

        assert!(open.record_failure(1).await.is_err());
    }
}
