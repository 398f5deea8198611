//! Session lifecycle orchestrator.
//!
//! A session moves `Active -> Rotated (still active) -> Revoked`. Every
//! operation here may run concurrently for the same user: each one reads and
//! then acts on independent session rows, and blacklisting is idempotent.
//! No in-process lock is held across a store call.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use warden_core::config::AuthConfig;
use warden_core::error::{ErrorKind, StoreError};
use warden_core::hashing::token_digest;
use warden_core::identity::{UserDirectory, VerifiedIdentity};
use warden_core::kv::KvStore;
use warden_core::revocation::RevocationReason;
use warden_core::session::{DeviceInfo, NewSession, Session, SessionStore, TokenRotation};
use warden_core::timeout::bounded;
use warden_core::types::{DbId, SessionId, Timestamp};
use warden_events::bus::{
    AuthEvent, EventBus, LOGGED_OUT, LOGIN_SUCCEEDED, REFRESH_REJECTED, SESSION_EVICTED,
    SESSION_REVOKED, TOKEN_REFRESHED,
};

use crate::cache::{RbacCache, RbacEntry, SessionCache};
use crate::error::AuthError;
use crate::jwt::{IssuedToken, TokenCodec, TokenError, TokenPurpose};
use crate::limiter::SessionLimiter;
use crate::registry::{remaining, RevocationRegistry};
use crate::terminate::SessionTerminator;

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Access + refresh pair handed to the client.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

impl TokenPair {
    fn new(access: IssuedToken, refresh: IssuedToken, now: Timestamp) -> Self {
        Self {
            expires_in: (access.expires_at - now).num_seconds(),
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: SessionId,
    pub tokens: TokenPair,
    pub profile: VerifiedIdentity,
    /// Sessions evicted to stay within the concurrent session cap.
    pub evicted: Vec<SessionId>,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub session_id: SessionId,
    pub tokens: TokenPair,
    pub profile: VerifiedIdentity,
}

/// A session as shown to its owner or an administrator.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub device_label: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub last_refreshed_at: Option<Timestamp>,
    /// Whether this is the session of the token making the request.
    pub current: bool,
}

/// Why a refresh was refused. Logged server-side only; the caller always
/// sees [`ErrorKind::RefreshTokenInvalid`].
#[derive(Debug, thiserror::Error)]
enum RefreshRejection {
    #[error("refresh token revoked ({0})")]
    Revoked(RevocationReason),
    #[error("refresh token failed verification: {0}")]
    Token(TokenError),
    #[error("user {0} no longer exists")]
    UnknownUser(DbId),
    #[error("user {0} is disabled")]
    AccountDisabled(DbId),
    #[error("no active session holds this refresh token")]
    NoActiveSession,
    #[error("session {0} was rotated concurrently")]
    RotationLost(SessionId),
}

/// Internal refresh failure: either a rejection to collapse, or a server fault.
enum RefreshFailure {
    Rejected(RefreshRejection),
    Fault(AuthError),
}

impl From<RefreshRejection> for RefreshFailure {
    fn from(r: RefreshRejection) -> Self {
        RefreshFailure::Rejected(r)
    }
}

impl From<StoreError> for RefreshFailure {
    fn from(e: StoreError) -> Self {
        RefreshFailure::Fault(AuthError::Store(e))
    }
}

impl From<jsonwebtoken::errors::Error> for RefreshFailure {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        RefreshFailure::Fault(AuthError::Signing(e))
    }
}

// ---------------------------------------------------------------------------
// SessionLifecycle
// ---------------------------------------------------------------------------

/// Composes codec, registry, store, limiter and caches into the six
/// lifecycle operations.
pub struct SessionLifecycle {
    config: Arc<AuthConfig>,
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    directory: Arc<dyn UserDirectory>,
    registry: RevocationRegistry,
    terminator: SessionTerminator,
    limiter: SessionLimiter,
    session_cache: SessionCache,
    rbac_cache: RbacCache,
    events: Arc<EventBus>,
}

impl SessionLifecycle {
    pub fn new(
        config: Arc<AuthConfig>,
        sessions: Arc<dyn SessionStore>,
        kv: Arc<dyn KvStore>,
        directory: Arc<dyn UserDirectory>,
        events: Arc<EventBus>,
    ) -> Self {
        let timeout = config.store_timeout;
        let codec = Arc::new(TokenCodec::new(&config));
        let registry = RevocationRegistry::new(kv.clone(), timeout);
        let terminator = SessionTerminator::new(sessions.clone(), registry.clone(), timeout);
        let limiter = SessionLimiter::new(
            sessions.clone(),
            terminator.clone(),
            config.max_concurrent_sessions,
            timeout,
        );
        let session_cache = SessionCache::new(kv.clone(), timeout);
        let rbac_cache = RbacCache::new(kv, config.refresh_ttl, timeout);
        Self {
            config,
            codec,
            sessions,
            directory,
            registry,
            terminator,
            limiter,
            session_cache,
            rbac_cache,
            events,
        }
    }

    pub fn codec(&self) -> Arc<TokenCodec> {
        self.codec.clone()
    }

    pub fn registry(&self) -> RevocationRegistry {
        self.registry.clone()
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // -- login --------------------------------------------------------------

    /// Start a session for an identity whose credentials were already checked.
    ///
    /// Always succeeds barring store faults: the session cap is enforced by
    /// evicting the oldest sessions first.
    pub async fn login(
        &self,
        identity: &VerifiedIdentity,
        device: DeviceInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let now = Utc::now();
        let (access, refresh) = self.codec.issue_pair(identity, now)?;

        let evicted = self.limiter.enforce(identity.id, now).await?;

        let input = NewSession {
            id: Uuid::now_v7(),
            user_id: identity.id,
            access_token_hash: token_digest(&access.token),
            refresh_token_hash: token_digest(&refresh.token),
            access_expires_at: access.expires_at,
            expires_at: refresh.expires_at,
            device_label: device.label,
            ip_address: device.ip_address,
            created_at: now,
        };
        let session = bounded(self.config.store_timeout, self.sessions.create(&input)).await?;

        self.mirror(&session, now).await;
        self.push_rbac(identity).await;

        for old in &evicted {
            self.session_cache_evict(&old.refresh_token_hash).await;
            self.events.publish(
                AuthEvent::new(SESSION_EVICTED)
                    .with_user(identity.id)
                    .with_session(old.id)
                    .with_payload(serde_json::json!({
                        "reason": RevocationReason::MaxSessionsExceeded.code(),
                        "replaced_by": session.id,
                    })),
            );
        }
        self.events.publish(
            AuthEvent::new(LOGIN_SUCCEEDED)
                .with_user(identity.id)
                .with_session(session.id)
                .with_payload(serde_json::json!({
                    "device": session.device_label,
                    "ip": session.ip_address,
                })),
        );
        tracing::info!(
            user_id = identity.id,
            session_id = %session.id,
            evicted = evicted.len(),
            "Session started"
        );

        Ok(LoginOutcome {
            session_id: session.id,
            tokens: TokenPair::new(access, refresh, now),
            profile: identity.clone(),
            evicted: evicted.into_iter().map(|s| s.id).collect(),
        })
    }

    // -- refresh ------------------------------------------------------------

    /// Exchange a refresh token for a new pair.
    ///
    /// Every failure, including store faults and timeouts, is reported as
    /// [`ErrorKind::RefreshTokenInvalid`]; the precise cause is only logged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AuthError> {
        match self.try_refresh(refresh_token).await {
            Ok(outcome) => Ok(outcome),
            Err(RefreshFailure::Rejected(cause)) => {
                tracing::warn!(cause = %cause, "Refresh rejected");
                self.events.publish(
                    AuthEvent::new(REFRESH_REJECTED)
                        .with_payload(serde_json::json!({ "cause": cause.to_string() })),
                );
                Err(AuthError::Rejected(ErrorKind::RefreshTokenInvalid))
            }
            Err(RefreshFailure::Fault(err)) => {
                tracing::error!(error = %err, "Refresh failed");
                Err(AuthError::Rejected(ErrorKind::RefreshTokenInvalid))
            }
        }
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, RefreshFailure> {
        if let Some(reason) = self.registry.reason_for(refresh_token).await? {
            return Err(RefreshRejection::Revoked(reason).into());
        }
        let claims = self
            .codec
            .verify(refresh_token, TokenPurpose::Refresh)
            .map_err(RefreshRejection::Token)?;

        // Roles and permissions are re-read on every refresh so changes take
        // effect within one cycle.
        let user = bounded(
            self.config.store_timeout,
            self.directory.find_by_id(claims.sub),
        )
        .await?
        .ok_or(RefreshRejection::UnknownUser(claims.sub))?;
        if !user.is_active {
            return Err(RefreshRejection::AccountDisabled(user.id).into());
        }

        let now = Utc::now();
        let digest = token_digest(refresh_token);
        let session = self
            .find_for_refresh(&digest, now)
            .await?
            .filter(|s| s.user_id == claims.sub)
            .ok_or(RefreshRejection::NoActiveSession)?;

        // The old refresh token is dead from here on, whatever happens next.
        self.registry
            .blacklist_digest(
                &digest,
                remaining(session.expires_at, now),
                RevocationReason::Rotated,
            )
            .await?;
        self.registry
            .blacklist_digest(
                &session.access_token_hash,
                remaining(session.access_expires_at, now),
                RevocationReason::Rotated,
            )
            .await?;

        let identity = user.identity();
        let (access, refresh) = self.codec.issue_pair(&identity, now)?;
        let rotation = TokenRotation {
            previous_refresh_hash: digest.clone(),
            access_token_hash: token_digest(&access.token),
            refresh_token_hash: token_digest(&refresh.token),
            access_expires_at: access.expires_at,
            expires_at: refresh.expires_at,
            rotated_at: now,
        };
        let rotated = bounded(
            self.config.store_timeout,
            self.sessions.rotate(session.id, &rotation),
        )
        .await?
        .ok_or(RefreshRejection::RotationLost(session.id))?;

        self.session_cache_evict(&digest).await;
        self.mirror(&rotated, now).await;
        self.push_rbac(&identity).await;

        self.events.publish(
            AuthEvent::new(TOKEN_REFRESHED)
                .with_user(identity.id)
                .with_session(rotated.id),
        );
        tracing::debug!(user_id = identity.id, session_id = %rotated.id, "Session rotated");

        Ok(RefreshOutcome {
            session_id: rotated.id,
            tokens: TokenPair::new(access, refresh, now),
            profile: identity,
        })
    }

    /// Cache first, store as the source of truth.
    async fn find_for_refresh(
        &self,
        digest: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        match self.session_cache.get(digest).await {
            Ok(Some(cached)) => {
                let row = bounded(
                    self.config.store_timeout,
                    self.sessions.find_by_id(cached.session_id),
                )
                .await?;
                if let Some(session) = row.filter(|s| s.is_live(now) && s.refresh_token_hash == digest)
                {
                    return Ok(Some(session));
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Session cache lookup failed, using store"),
        }
        bounded(
            self.config.store_timeout,
            self.sessions.find_active_by_refresh_hash(digest, now),
        )
        .await
    }

    // -- logout -------------------------------------------------------------

    /// End the session holding `access_token`.
    ///
    /// Returns `false`, not an error, when there is nothing to log out.
    pub async fn logout(&self, user_id: DbId, access_token: &str) -> Result<bool, AuthError> {
        let now = Utc::now();
        let Some(session) = self.current_session(user_id, access_token).await? else {
            tracing::debug!(user_id, "Logout with no matching active session");
            return Ok(false);
        };

        self.terminator
            .terminate(&session, RevocationReason::UserLogout, now)
            .await?;
        self.session_cache_evict(&session.refresh_token_hash).await;
        self.clear_rbac(user_id).await;

        self.events.publish(
            AuthEvent::new(LOGGED_OUT)
                .with_user(user_id)
                .with_session(session.id),
        );
        tracing::info!(user_id, session_id = %session.id, "Session logged out");
        Ok(true)
    }

    /// End every active session of `user_id` except `keep`.
    pub async fn logout_others(
        &self,
        user_id: DbId,
        keep: SessionId,
    ) -> Result<Vec<SessionId>, AuthError> {
        let now = Utc::now();
        let others: Vec<Session> = self
            .active_sessions(user_id, now)
            .await?
            .into_iter()
            .filter(|s| s.id != keep)
            .collect();

        let revoked = self
            .revoke_sessions(&others, RevocationReason::LoggedOutElsewhere, now, Some(user_id))
            .await?;
        tracing::info!(user_id, kept = %keep, revoked = revoked.len(), "Logged out other sessions");
        Ok(revoked)
    }

    /// End every active session of `user_id`, e.g. after a password change.
    pub async fn revoke_all(
        &self,
        user_id: DbId,
        reason: RevocationReason,
        actor: Option<DbId>,
    ) -> Result<Vec<SessionId>, AuthError> {
        let now = Utc::now();
        let active = self.active_sessions(user_id, now).await?;
        let revoked = self.revoke_sessions(&active, reason, now, actor).await?;
        self.clear_rbac(user_id).await;
        tracing::info!(user_id, reason = %reason, revoked = revoked.len(), "Revoked all sessions");
        Ok(revoked)
    }

    /// End one session of `user_id`.
    ///
    /// [`AuthError::SessionNotFound`] when the session does not exist or
    /// belongs to someone else; `Ok(false)` when it was already ended.
    pub async fn revoke_one(
        &self,
        user_id: DbId,
        session_id: SessionId,
        reason: RevocationReason,
        actor: Option<DbId>,
    ) -> Result<bool, AuthError> {
        let now = Utc::now();
        let session = bounded(self.config.store_timeout, self.sessions.find_by_id(session_id))
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(AuthError::SessionNotFound)?;
        if !session.is_live(now) {
            return Ok(false);
        }

        let revoked = self
            .revoke_sessions(std::slice::from_ref(&session), reason, now, actor)
            .await?;
        Ok(!revoked.is_empty())
    }

    // -- queries ------------------------------------------------------------

    /// Active sessions of `user_id`, oldest first, flagging the one that
    /// `current_access_token` belongs to.
    pub async fn list_sessions(
        &self,
        user_id: DbId,
        current_access_token: Option<&str>,
    ) -> Result<Vec<SessionView>, AuthError> {
        let current = current_access_token.map(token_digest);
        let views = self
            .active_sessions(user_id, Utc::now())
            .await?
            .into_iter()
            .map(|s| SessionView {
                current: current.as_deref() == Some(s.access_token_hash.as_str()),
                id: s.id,
                device_label: s.device_label,
                ip_address: s.ip_address,
                created_at: s.created_at,
                expires_at: s.expires_at,
                last_refreshed_at: s.last_refreshed_at,
            })
            .collect();
        Ok(views)
    }

    /// The active session whose current access token is `access_token`.
    pub async fn current_session(
        &self,
        user_id: DbId,
        access_token: &str,
    ) -> Result<Option<Session>, AuthError> {
        let found = bounded(
            self.config.store_timeout,
            self.sessions
                .find_active_by_access_hash(user_id, &token_digest(access_token), Utc::now()),
        )
        .await?;
        Ok(found)
    }

    /// The RBAC codes last pushed for `user_id`, if any.
    pub async fn cached_rbac(&self, user_id: DbId) -> Result<Option<RbacEntry>, AuthError> {
        Ok(self.rbac_cache.get(user_id).await?)
    }

    // -- helpers ------------------------------------------------------------

    async fn active_sessions(&self, user_id: DbId, now: Timestamp) -> Result<Vec<Session>, AuthError> {
        Ok(bounded(
            self.config.store_timeout,
            self.sessions.list_active(user_id, now),
        )
        .await?)
    }

    async fn revoke_sessions(
        &self,
        sessions: &[Session],
        reason: RevocationReason,
        now: Timestamp,
        actor: Option<DbId>,
    ) -> Result<Vec<SessionId>, AuthError> {
        let mut revoked = Vec::with_capacity(sessions.len());
        for session in sessions {
            if !self.terminator.terminate(session, reason, now).await? {
                continue;
            }
            self.session_cache_evict(&session.refresh_token_hash).await;

            let mut event = AuthEvent::new(SESSION_REVOKED)
                .with_user(session.user_id)
                .with_session(session.id)
                .with_payload(serde_json::json!({ "reason": reason.code() }));
            if let Some(actor) = actor {
                event = event.with_actor(actor);
            }
            self.events.publish(event);
            revoked.push(session.id);
        }
        Ok(revoked)
    }

    async fn mirror(&self, session: &Session, now: Timestamp) {
        if let Err(e) = self.session_cache.put(session, now).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to cache session");
        }
    }

    async fn session_cache_evict(&self, refresh_hash: &str) {
        if let Err(e) = self.session_cache.evict(refresh_hash).await {
            tracing::warn!(error = %e, "Failed to evict cached session");
        }
    }

    async fn push_rbac(&self, identity: &VerifiedIdentity) {
        let entry = RbacEntry {
            roles: identity.role_codes.clone(),
            permissions: identity.permission_codes.clone(),
        };
        if let Err(e) = self.rbac_cache.put(identity.id, &entry).await {
            tracing::warn!(user_id = identity.id, error = %e, "Failed to push RBAC codes");
        }
    }

    async fn clear_rbac(&self, user_id: DbId) {
        if let Err(e) = self.rbac_cache.clear(user_id).await {
            tracing::warn!(user_id, error = %e, "Failed to clear RBAC codes");
        }
    }
}
