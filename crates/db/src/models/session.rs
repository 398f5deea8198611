//! User session row model.

use sqlx::FromRow;
use warden_core::session::Session;
use warden_core::types::{DbId, SessionId, Timestamp};

/// A row from the `user_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserSessionRow {
    pub id: SessionId,
    pub user_id: DbId,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_expires_at: Timestamp,
    pub expires_at: Timestamp,
    pub device_label: Option<String>,
    pub ip_address: Option<String>,
    pub is_active: bool,
    pub revoked_at: Option<Timestamp>,
    pub revoke_reason: Option<String>,
    pub last_refreshed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<UserSessionRow> for Session {
    fn from(row: UserSessionRow) -> Self {
        // Unknown reason codes (written by a newer release) are kept as `None`
        // rather than failing the whole read.
        let revoke_reason = row.revoke_reason.as_deref().and_then(|r| r.parse().ok());
        Session {
            id: row.id,
            user_id: row.user_id,
            access_token_hash: row.access_token_hash,
            refresh_token_hash: row.refresh_token_hash,
            access_expires_at: row.access_expires_at,
            expires_at: row.expires_at,
            device_label: row.device_label,
            ip_address: row.ip_address,
            is_active: row.is_active,
            revoked_at: row.revoked_at,
            revoke_reason,
            last_refreshed_at: row.last_refreshed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
