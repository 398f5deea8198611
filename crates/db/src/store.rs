//! Postgres-backed [`SessionStore`].

use async_trait::async_trait;
use warden_core::error::StoreError;
use warden_core::revocation::RevocationReason;
use warden_core::session::{NewSession, Session, SessionStore, TokenRotation};
use warden_core::types::{DbId, SessionId, Timestamp};

use crate::repositories::SessionRepo;
use crate::DbPool;

/// [`SessionStore`] over the `user_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Session store query failed");
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, input: &NewSession) -> Result<Session, StoreError> {
        SessionRepo::create(&self.pool, input)
            .await
            .map(Session::from)
            .map_err(backend)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        SessionRepo::find_by_id(&self.pool, id)
            .await
            .map(|row| row.map(Session::from))
            .map_err(backend)
    }

    async fn list_active(&self, user_id: DbId, now: Timestamp) -> Result<Vec<Session>, StoreError> {
        SessionRepo::list_active(&self.pool, user_id, now)
            .await
            .map(|rows| rows.into_iter().map(Session::from).collect())
            .map_err(backend)
    }

    async fn find_active_by_access_hash(
        &self,
        user_id: DbId,
        access_hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        SessionRepo::find_active_by_access_hash(&self.pool, user_id, access_hash, now)
            .await
            .map(|row| row.map(Session::from))
            .map_err(backend)
    }

    async fn find_active_by_refresh_hash(
        &self,
        refresh_hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        SessionRepo::find_active_by_refresh_hash(&self.pool, refresh_hash, now)
            .await
            .map(|row| row.map(Session::from))
            .map_err(backend)
    }

    async fn rotate(
        &self,
        id: SessionId,
        rotation: &TokenRotation,
    ) -> Result<Option<Session>, StoreError> {
        SessionRepo::rotate(&self.pool, id, rotation)
            .await
            .map(|row| row.map(Session::from))
            .map_err(backend)
    }

    async fn revoke(
        &self,
        id: SessionId,
        reason: RevocationReason,
        at: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        SessionRepo::revoke(&self.pool, id, reason, at)
            .await
            .map(|row| row.map(Session::from))
            .map_err(backend)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(backend)
    }
}
