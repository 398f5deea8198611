//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`. The channel is bounded: when a
//! subscriber falls behind, the oldest events are dropped for that subscriber
//! rather than slowing down the publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use warden_core::types::{DbId, SessionId};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const LOGIN_SUCCEEDED: &str = "auth.login_succeeded";
pub const LOGIN_FAILED: &str = "auth.login_failed";
pub const TOKEN_REFRESHED: &str = "auth.token_refreshed";
pub const REFRESH_REJECTED: &str = "auth.refresh_rejected";
pub const LOGGED_OUT: &str = "auth.logged_out";
pub const SESSION_EVICTED: &str = "session.evicted";
pub const SESSION_REVOKED: &str = "session.revoked";
pub const ACCESS_REJECTED: &str = "auth.access_rejected";
pub const ACCOUNT_LOCKED: &str = "account.locked";
pub const ACCOUNT_UNLOCKED: &str = "account.unlocked";

// ---------------------------------------------------------------------------
// AuthEvent
// ---------------------------------------------------------------------------

/// Something that happened to a session or an account.
///
/// Built with [`AuthEvent::new`] and the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Dot-separated event name, e.g. `"auth.login_succeeded"`.
    pub event_type: String,

    /// The user the event concerns.
    pub user_id: Option<DbId>,

    /// The user who caused it, when different (administrative actions).
    pub actor_user_id: Option<DbId>,

    pub session_id: Option<SessionId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl AuthEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_id: None,
            actor_user_id: None,
            session_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use warden_events::bus::{AuthEvent, EventBus, LOGGED_OUT};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AuthEvent::new(LOGGED_OUT).with_user(7));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers observe `RecvError::Lagged` once the buffer wraps.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: AuthEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let sid = Uuid::now_v7();

        bus.publish(
            AuthEvent::new(SESSION_REVOKED)
                .with_user(42)
                .with_actor(1)
                .with_session(sid)
                .with_payload(serde_json::json!({"reason": "ADMIN_REVOKED"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, SESSION_REVOKED);
        assert_eq!(received.user_id, Some(42));
        assert_eq!(received.actor_user_id, Some(1));
        assert_eq!(received.session_id, Some(sid));
        assert_eq!(received.payload["reason"], "ADMIN_REVOKED");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(AuthEvent::new(LOGGED_OUT));

        assert_eq!(rx1.recv().await.unwrap().event_type, LOGGED_OUT);
        assert_eq!(rx2.recv().await.unwrap().event_type, LOGGED_OUT);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(AuthEvent::new(LOGIN_FAILED));
    }

    #[tokio::test]
    async fn full_buffer_drops_oldest_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for user_id in 0..5 {
            bus.publish(AuthEvent::new(LOGIN_SUCCEEDED).with_user(user_id));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().user_id, Some(3));
    }
}
