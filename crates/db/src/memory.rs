//! In-process [`SessionStore`] for tests and single-node development.
//!
//! Mirrors the semantics of the Postgres queries, including the
//! compare-and-swap guard on rotation. Data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::error::StoreError;
use warden_core::revocation::RevocationReason;
use warden_core::session::{NewSession, Session, SessionStore, TokenRotation};
use warden_core::types::{DbId, SessionId, Timestamp};

/// Sessions held in a `RwLock<HashMap>`; each method takes the lock once.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows ever stored, active or not.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, input: &NewSession) -> Result<Session, StoreError> {
        let session = Session {
            id: input.id,
            user_id: input.user_id,
            access_token_hash: input.access_token_hash.clone(),
            refresh_token_hash: input.refresh_token_hash.clone(),
            access_expires_at: input.access_expires_at,
            expires_at: input.expires_at,
            device_label: input.device_label.clone(),
            ip_address: input.ip_address.clone(),
            is_active: true,
            revoked_at: None,
            revoke_reason: None,
            last_refreshed_at: None,
            created_at: input.created_at,
            updated_at: input.created_at,
        };
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&input.id) {
            return Err(StoreError::Backend(format!(
                "session {} already exists",
                input.id
            )));
        }
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn list_active(&self, user_id: DbId, now: Timestamp) -> Result<Vec<Session>, StoreError> {
        let mut active: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.is_live(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn find_active_by_access_hash(
        &self,
        user_id: DbId,
        access_hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.user_id == user_id && s.access_token_hash == access_hash && s.is_live(now))
            .cloned())
    }

    async fn find_active_by_refresh_hash(
        &self,
        refresh_hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.refresh_token_hash == refresh_hash && s.is_live(now))
            .cloned())
    }

    async fn rotate(
        &self,
        id: SessionId,
        rotation: &TokenRotation,
    ) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&id) else {
            return Ok(None);
        };
        if !session.is_active || session.refresh_token_hash != rotation.previous_refresh_hash {
            return Ok(None);
        }
        session.access_token_hash = rotation.access_token_hash.clone();
        session.refresh_token_hash = rotation.refresh_token_hash.clone();
        session.access_expires_at = rotation.access_expires_at;
        session.expires_at = rotation.expires_at;
        session.last_refreshed_at = Some(rotation.rotated_at);
        session.updated_at = rotation.rotated_at;
        Ok(Some(session.clone()))
    }

    async fn revoke(
        &self,
        id: SessionId,
        reason: RevocationReason,
        at: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.is_active => {
                session.is_active = false;
                session.revoked_at = Some(at);
                session.revoke_reason = Some(reason);
                session.updated_at = at;
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn new_session(user_id: DbId, tag: &str, created_at: Timestamp) -> NewSession {
        NewSession {
            id: Uuid::now_v7(),
            user_id,
            access_token_hash: format!("at-{tag}"),
            refresh_token_hash: format!("rt-{tag}"),
            access_expires_at: created_at + Duration::minutes(15),
            expires_at: created_at + Duration::days(7),
            device_label: None,
            ip_address: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn list_active_is_oldest_first_and_skips_expired_and_revoked() {
        let store = MemorySessionStore::new();
        let now = Utc::now();

        let newest = store.create(&new_session(1, "n", now)).await.unwrap();
        let oldest = store
            .create(&new_session(1, "o", now - Duration::hours(2)))
            .await
            .unwrap();
        let revoked = store
            .create(&new_session(1, "r", now - Duration::hours(1)))
            .await
            .unwrap();
        store
            .revoke(revoked.id, RevocationReason::AdminRevoked, now)
            .await
            .unwrap();
        let mut expired = new_session(1, "e", now - Duration::days(8));
        expired.expires_at = now - Duration::days(1);
        store.create(&expired).await.unwrap();
        store.create(&new_session(2, "other", now)).await.unwrap();

        let ids: Vec<_> = store
            .list_active(1, now)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![oldest.id, newest.id]);
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn rotate_requires_current_refresh_hash() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let session = store.create(&new_session(1, "a", now)).await.unwrap();

        let rotation = TokenRotation {
            previous_refresh_hash: "rt-a".into(),
            access_token_hash: "at-b".into(),
            refresh_token_hash: "rt-b".into(),
            access_expires_at: now + Duration::minutes(15),
            expires_at: now + Duration::days(7),
            rotated_at: now,
        };
        let rotated = store.rotate(session.id, &rotation).await.unwrap().unwrap();
        assert_eq!(rotated.refresh_token_hash, "rt-b");
        assert_eq!(rotated.last_refreshed_at, Some(now));

        assert!(store.rotate(session.id, &rotation).await.unwrap().is_none());
        assert!(store
            .find_active_by_refresh_hash("rt-a", now)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_active_by_refresh_hash("rt-b", now)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn revoke_reports_first_transition_only() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let session = store.create(&new_session(7, "a", now)).await.unwrap();

        let revoked = store
            .revoke(session.id, RevocationReason::UserLogout, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(revoked.refresh_token_hash, "rt-a");
        assert!(!revoked.is_active);
        assert!(store
            .revoke(session.id, RevocationReason::AdminRevoked, now)
            .await
            .unwrap()
            .is_none());

        let stored = store.find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(stored.revoke_reason, Some(RevocationReason::UserLogout));
        assert!(store
            .find_active_by_access_hash(7, "at-a", now)
            .await
            .unwrap()
            .is_none());
    }
}
