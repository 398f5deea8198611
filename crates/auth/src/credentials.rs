//! Username/password check in front of [`SessionLifecycle::login`](crate::SessionLifecycle::login).
//!
//! Wires the user directory, Argon2 verification and the lockout counter
//! together. Lockout store failures never decide the outcome on their own;
//! the configured failure policy does.

use std::sync::Arc;
use std::time::Duration;

use warden_core::error::ErrorKind;
use warden_core::identity::{UserDirectory, VerifiedIdentity};
use warden_core::timeout::bounded;
use warden_core::types::DbId;
use warden_events::bus::{AuthEvent, EventBus, ACCOUNT_LOCKED, ACCOUNT_UNLOCKED, LOGIN_FAILED};

use crate::error::AuthError;
use crate::lockout::{LockStatus, LockoutCounter};
use crate::password::verify_password;

#[derive(Clone)]
pub struct CredentialVerifier {
    directory: Arc<dyn UserDirectory>,
    lockout: LockoutCounter,
    events: Arc<EventBus>,
    timeout: Duration,
}

impl CredentialVerifier {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        lockout: LockoutCounter,
        events: Arc<EventBus>,
        timeout: Duration,
    ) -> Self {
        Self {
            directory,
            lockout,
            events,
            timeout,
        }
    }

    /// Check `username` / `password`, returning the identity to log in.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub async fn verify(&self, username: &str, password: &str) -> Result<VerifiedIdentity, AuthError> {
        let user = bounded(self.timeout, self.directory.find_by_username(username))
            .await?
            .ok_or_else(|| {
                self.publish_failure(None, "unknown_user");
                AuthError::Rejected(ErrorKind::InvalidCredentials)
            })?;

        let status = self.lockout.check_locked(user.id).await;
        if status.locked {
            self.publish_failure(Some(user.id), "locked");
            return Err(AuthError::Locked {
                remaining_secs: status.remaining_secs.unwrap_or_default(),
            });
        }

        let password = password.to_owned();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Password(e.to_string()))?
            .map_err(|e| AuthError::Password(e.to_string()))?;

        if !valid {
            return Err(self.count_failure(user.id).await);
        }

        if !user.is_active {
            self.publish_failure(Some(user.id), "disabled");
            return Err(AuthError::Rejected(ErrorKind::AccountDisabled));
        }

        if let Err(e) = self.lockout.reset(user.id).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to reset lockout counter");
        }
        Ok(user.identity())
    }

    /// Lock state of `user_id`, for administrators.
    pub async fn lock_status(&self, user_id: DbId) -> LockStatus {
        self.lockout.check_locked(user_id).await
    }

    /// Administrative unlock.
    pub async fn unlock(&self, user_id: DbId, actor: DbId) -> Result<(), AuthError> {
        self.lockout.unlock(user_id).await?;
        self.events.publish(
            AuthEvent::new(ACCOUNT_UNLOCKED)
                .with_user(user_id)
                .with_actor(actor),
        );
        Ok(())
    }

    async fn count_failure(&self, user_id: DbId) -> AuthError {
        self.publish_failure(Some(user_id), "bad_password");
        match self.lockout.record_failure(user_id).await {
            Ok(outcome) if outcome.newly_locked => {
                let secs = outcome.locked_for.map(|d| d.as_secs()).unwrap_or_default();
                self.events.publish(
                    AuthEvent::new(ACCOUNT_LOCKED)
                        .with_user(user_id)
                        .with_payload(serde_json::json!({ "lock_secs": secs })),
                );
                AuthError::Locked {
                    remaining_secs: secs,
                }
            }
            Ok(_) => AuthError::Rejected(ErrorKind::InvalidCredentials),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to record failed login");
                AuthError::Rejected(ErrorKind::InvalidCredentials)
            }
        }
    }

    fn publish_failure(&self, user_id: Option<DbId>, cause: &str) {
        let mut event =
            AuthEvent::new(LOGIN_FAILED).with_payload(serde_json::json!({ "cause": cause }));
        if let Some(id) = user_id {
            event = event.with_user(id);
        }
        self.events.publish(event);
    }
}
