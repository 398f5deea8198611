//! Session records and the [`SessionStore`] seam.
//!
//! A session binds a token pair to a user and a device. Token values are held
//! only as SHA-256 digests (see [`crate::hashing::token_digest`]). Rows are
//! never deleted: revocation flips `is_active` and stamps `revoked_at`, so the
//! table doubles as an audit trail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::revocation::RevocationReason;
use crate::types::{DbId, SessionId, Timestamp};

/// One login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: DbId,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    /// Expiry of the current access token.
    pub access_expires_at: Timestamp,
    /// Expiry of the current refresh token; the session is dead after this.
    pub expires_at: Timestamp,
    pub device_label: Option<String>,
    pub ip_address: Option<String>,
    pub is_active: bool,
    pub revoked_at: Option<Timestamp>,
    pub revoke_reason: Option<RevocationReason>,
    pub last_refreshed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// Active and not past its refresh expiry at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.is_active && self.expires_at > now
    }
}

/// Input for inserting a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: SessionId,
    pub user_id: DbId,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_expires_at: Timestamp,
    pub expires_at: Timestamp,
    pub device_label: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}

/// A token-pair rotation applied to an existing session.
#[derive(Debug, Clone)]
pub struct TokenRotation {
    /// Digest of the refresh token being replaced; the update only applies
    /// while the row still holds it.
    pub previous_refresh_hash: String,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_expires_at: Timestamp,
    pub expires_at: Timestamp,
    pub rotated_at: Timestamp,
}

/// Device metadata captured at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Free-form label, typically derived from the `User-Agent`.
    pub label: Option<String>,
    pub ip_address: Option<String>,
}

/// Durable storage of [`Session`] rows.
///
/// Implementations must make each method a single atomic write or read; no
/// method may leave a row half-updated.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session row.
    async fn create(&self, input: &NewSession) -> Result<Session, StoreError>;

    /// Find a session by id regardless of state.
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// All active, non-expired sessions for a user, oldest first.
    async fn list_active(&self, user_id: DbId, now: Timestamp) -> Result<Vec<Session>, StoreError>;

    /// The active, non-expired session for `user_id` whose current access token has `access_hash`.
    async fn find_active_by_access_hash(
        &self,
        user_id: DbId,
        access_hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// The active, non-expired session whose current refresh token has `refresh_hash`.
    async fn find_active_by_refresh_hash(
        &self,
        refresh_hash: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// Replace the token pair of an active session.
    ///
    /// Returns `None` when the row is no longer active or no longer holds
    /// `rotation.previous_refresh_hash` (a concurrent refresh won).
    async fn rotate(
        &self,
        id: SessionId,
        rotation: &TokenRotation,
    ) -> Result<Option<Session>, StoreError>;

    /// Mark a session inactive and return the row as revoked, including the
    /// token digests it held at that moment. `None` if it was already inactive.
    async fn revoke(
        &self,
        id: SessionId,
        reason: RevocationReason,
        at: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// Backend liveness probe.
    async fn health_check(&self) -> Result<(), StoreError>;
}
