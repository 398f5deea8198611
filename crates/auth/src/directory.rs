//! [`UserDirectory`] backed by a fixed list of users, loaded from JSON.
//!
//! Used by the binary for small deployments and by tests. Anything larger
//! implements the trait against its own identity source.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::error::{CoreError, StoreError};
use warden_core::identity::{DirectoryUser, UserDirectory};
use warden_core::types::DbId;

#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: RwLock<HashMap<DbId, DirectoryUser>>,
}

impl StaticUserDirectory {
    /// Build from a list, rejecting duplicate ids or usernames.
    pub fn new(users: Vec<DirectoryUser>) -> Result<Self, CoreError> {
        let mut by_id = HashMap::with_capacity(users.len());
        for user in users {
            if by_id.values().any(|u: &DirectoryUser| u.username == user.username) {
                return Err(CoreError::Validation(format!(
                    "duplicate username '{}' in user directory",
                    user.username
                )));
            }
            if let Some(existing) = by_id.insert(user.id, user) {
                return Err(CoreError::Validation(format!(
                    "duplicate user id {} in user directory",
                    existing.id
                )));
            }
        }
        Ok(Self {
            users: RwLock::new(by_id),
        })
    }

    /// Parse a JSON array of users.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let users: Vec<DirectoryUser> = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("invalid user directory JSON: {e}")))?;
        Self::new(users)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Internal(format!("cannot read user directory {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Insert or replace a user.
    pub async fn upsert(&self, user: DirectoryUser) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
