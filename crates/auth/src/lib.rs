//! Session and token lifecycle.
//!
//! The [`SessionLifecycle`] orchestrator composes the pieces below; the API
//! crate only talks to it, to the [`AccessGuard`] and to the
//! [`CredentialVerifier`].
//!
//! - [`jwt`] -- HS256 token codec with distinct access / refresh secrets.
//! - [`registry`] -- revocation registry ("blacklist") over a [`KvStore`](warden_core::kv::KvStore).
//! - [`cache`] -- fast-lookup session cache and the RBAC code cache.
//! - [`limiter`] -- per-user concurrent session cap with oldest-first eviction.
//! - [`lockout`] -- progressive account lockout counter.
//! - [`guard`] -- bearer-token authentication for protected requests.

pub mod cache;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod guard;
pub mod jwt;
pub mod lifecycle;
pub mod limiter;
pub mod lockout;
pub mod password;
pub mod registry;
pub mod terminate;

pub use credentials::CredentialVerifier;
pub use directory::StaticUserDirectory;
pub use error::AuthError;
pub use guard::{AccessGuard, Authenticated};
pub use jwt::{Claims, TokenCodec, TokenError, TokenPurpose};
pub use lifecycle::{LoginOutcome, RefreshOutcome, SessionLifecycle, SessionView, TokenPair};
pub use lockout::{LockStatus, LockoutCounter};
pub use registry::RevocationRegistry;
