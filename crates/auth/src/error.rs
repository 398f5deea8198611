use warden_core::error::{ErrorKind, StoreError};
use warden_core::revocation::RevocationReason;

/// Failure of an orchestrator, guard or credential operation.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authentication failed with a client-facing kind.
    #[error("authentication rejected: {0}")]
    Rejected(ErrorKind),

    /// The presented token is in the revocation registry.
    #[error("token revoked: {0}")]
    Revoked(RevocationReason),

    /// Too many failed logins; retry after `remaining_secs`.
    #[error("account locked for {remaining_secs}s")]
    Locked { remaining_secs: u64 },

    /// The session does not exist or belongs to another user.
    #[error("session not found")]
    SessionNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("password verification failed: {0}")]
    Password(String),
}

impl AuthError {
    /// The client-facing kind, or `None` for server-side failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AuthError::Rejected(kind) => Some(*kind),
            AuthError::Revoked(reason) => Some(reason.error_kind()),
            AuthError::Locked { .. } => Some(ErrorKind::AccountLocked),
            AuthError::SessionNotFound
            | AuthError::Store(_)
            | AuthError::Signing(_)
            | AuthError::Password(_) => None,
        }
    }
}
