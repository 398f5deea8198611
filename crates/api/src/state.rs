use std::sync::Arc;

use warden_auth::{AccessGuard, CredentialVerifier, LockoutCounter, SessionLifecycle};
use warden_core::identity::UserDirectory;
use warden_core::kv::KvStore;
use warden_core::session::SessionStore;
use warden_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub lifecycle: Arc<SessionLifecycle>,
    pub guard: AccessGuard,
    pub credentials: CredentialVerifier,
    /// Held directly for health checks.
    pub sessions: Arc<dyn SessionStore>,
    pub kv: Arc<dyn KvStore>,
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the session core on top of the given backends.
    pub fn new(
        config: ServerConfig,
        sessions: Arc<dyn SessionStore>,
        kv: Arc<dyn KvStore>,
        directory: Arc<dyn UserDirectory>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let auth = Arc::new(config.auth.clone());
        let timeout = auth.store_timeout;

        let lifecycle = Arc::new(SessionLifecycle::new(
            auth.clone(),
            sessions.clone(),
            kv.clone(),
            directory.clone(),
            event_bus.clone(),
        ));
        let guard = AccessGuard::new(lifecycle.codec(), lifecycle.registry(), event_bus.clone());
        let lockout = LockoutCounter::new(
            kv.clone(),
            auth.lockout.clone(),
            auth.lockout_store_failure,
            timeout,
        );
        let credentials = CredentialVerifier::new(directory, lockout, event_bus.clone(), timeout);

        Self {
            config: Arc::new(config),
            lifecycle,
            guard,
            credentials,
            sessions,
            kv,
            event_bus,
        }
    }
}
