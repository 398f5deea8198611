//! Audit side channel for the session core.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Publishing never blocks and never fails.
//! - [`AuthEvent`] -- the audit event envelope.
//! - [`AuditLog`] -- background task writing every event to the `audit`
//!   tracing target.

pub mod audit;
pub mod bus;

pub use audit::AuditLog;
pub use bus::{AuthEvent, EventBus};
