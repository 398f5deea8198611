//! Identity types exchanged with the external identity source.
//!
//! Credential checking and the RBAC matrix live outside the session core. The
//! core only consumes a [`VerifiedIdentity`] at login and re-reads the current
//! roles and permissions through [`UserDirectory`] on every refresh, so
//! permission changes take effect within one refresh cycle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::DbId;

/// An identity whose credentials have already been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role_codes: Vec<String>,
    pub permission_codes: Vec<String>,
}

/// A user record as known to the identity source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: DbId,
    pub username: String,
    pub email: String,
    /// PHC-formatted password hash. Never leaves the login handler.
    pub password_hash: String,
    pub is_active: bool,
    #[serde(default)]
    pub role_codes: Vec<String>,
    #[serde(default)]
    pub permission_codes: Vec<String>,
}

impl DirectoryUser {
    /// The identity to issue tokens for, without the password hash.
    pub fn identity(&self) -> VerifiedIdentity {
        VerifiedIdentity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role_codes: self.role_codes.clone(),
            permission_codes: self.permission_codes.clone(),
        }
    }
}

/// Read-only view of the identity source.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<DirectoryUser>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<DirectoryUser>, StoreError>;
}
