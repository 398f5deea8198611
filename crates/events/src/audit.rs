//! Audit logger task.
//!
//! [`AuditLog`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every received [`AuthEvent`] as a structured record under the
//! `audit` tracing target. It shuts down when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::AuthEvent;

/// Tracing target audit records are written under.
pub const AUDIT_TARGET: &str = "audit";

pub struct AuditLog;

impl AuditLog {
    /// Run the logging loop until the channel closes. Returns the number of
    /// events written.
    pub async fn run(mut receiver: broadcast::Receiver<AuthEvent>) -> u64 {
        let mut written = 0u64;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::write(&event);
                    written += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Audit log lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(written, "Event bus closed, audit log shutting down");
                    break;
                }
            }
        }
        written
    }

    fn write(event: &AuthEvent) {
        tracing::info!(
            target: AUDIT_TARGET,
            event_type = %event.event_type,
            user_id = ?event.user_id,
            actor_user_id = ?event.actor_user_id,
            session_id = ?event.session_id,
            payload = %event.payload,
            at = %event.timestamp.to_rfc3339(),
            "audit"
        );
    }
}
