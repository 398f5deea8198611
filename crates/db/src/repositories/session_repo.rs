//! Repository for the `user_sessions` table.

use sqlx::PgPool;
use warden_core::revocation::RevocationReason;
use warden_core::session::{NewSession, TokenRotation};
use warden_core::types::{DbId, SessionId, Timestamp};

use crate::models::session::UserSessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, access_token_hash, refresh_token_hash, access_expires_at, \
                       expires_at, device_label, ip_address, is_active, revoked_at, \
                       revoke_reason, last_refreshed_at, created_at, updated_at";

/// Provides CRUD operations for user sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewSession) -> Result<UserSessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (id, user_id, access_token_hash, refresh_token_hash,
                                        access_expires_at, expires_at, device_label, ip_address,
                                        created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(&input.access_token_hash)
            .bind(&input.refresh_token_hash)
            .bind(input.access_expires_at)
            .bind(input.expires_at)
            .bind(&input.device_label)
            .bind(&input.ip_address)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by id, active or not.
    pub async fn find_by_id(
        pool: &PgPool,
        id: SessionId,
    ) -> Result<Option<UserSessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE id = $1");
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active, non-expired sessions for a user, oldest first.
    pub async fn list_active(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<UserSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE user_id = $1
               AND is_active = true
               AND expires_at > $2
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// The active session of `user_id` whose current access token hashes to `hash`.
    pub async fn find_active_by_access_hash(
        pool: &PgPool,
        user_id: DbId,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<UserSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE user_id = $1
               AND access_token_hash = $2
               AND is_active = true
               AND expires_at > $3"
        );
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(user_id)
            .bind(hash)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// The active session whose current refresh token hashes to `hash`.
    pub async fn find_active_by_refresh_hash(
        pool: &PgPool,
        hash: &str,
        now: Timestamp,
    ) -> Result<Option<UserSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE refresh_token_hash = $1
               AND is_active = true
               AND expires_at > $2"
        );
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(hash)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Swap the token pair in a single statement.
    ///
    /// The `refresh_token_hash = $2` guard makes concurrent rotations of the
    /// same session compare-and-swap: exactly one wins, the rest see `None`.
    pub async fn rotate(
        pool: &PgPool,
        id: SessionId,
        rotation: &TokenRotation,
    ) -> Result<Option<UserSessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET
                access_token_hash = $3,
                refresh_token_hash = $4,
                access_expires_at = $5,
                expires_at = $6,
                last_refreshed_at = $7
             WHERE id = $1
               AND refresh_token_hash = $2
               AND is_active = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(id)
            .bind(&rotation.previous_refresh_hash)
            .bind(&rotation.access_token_hash)
            .bind(&rotation.refresh_token_hash)
            .bind(rotation.access_expires_at)
            .bind(rotation.expires_at)
            .bind(rotation.rotated_at)
            .fetch_optional(pool)
            .await
    }

    /// Revoke a single session, returning the row with the token digests it
    /// held when the update landed. `None` if it was already inactive.
    pub async fn revoke(
        pool: &PgPool,
        id: SessionId,
        reason: RevocationReason,
        at: Timestamp,
    ) -> Result<Option<UserSessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET is_active = false, revoked_at = $2, revoke_reason = $3
             WHERE id = $1 AND is_active = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSessionRow>(&query)
            .bind(id)
            .bind(at)
            .bind(reason.code())
            .fetch_optional(pool)
            .await
    }
}
