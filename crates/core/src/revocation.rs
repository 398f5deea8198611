//! Revocation reasons recorded alongside blacklisted tokens.
//!
//! The reason is what lets a client tell "someone signed in on a sixth device"
//! apart from "you refreshed elsewhere" apart from "an administrator kicked you".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Why a token or session was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationReason {
    /// Superseded by a refresh; the session itself is still alive.
    Rotated,
    /// The user logged out of this session.
    UserLogout,
    /// The user logged out of every other session.
    LoggedOutElsewhere,
    /// Evicted by the concurrent-session limiter.
    MaxSessionsExceeded,
    /// An administrator revoked the session.
    AdminRevoked,
    /// All sessions revoked after a password change.
    PasswordChanged,
    /// All sessions revoked in response to a security incident.
    SecurityIncident,
}

impl RevocationReason {
    /// Stable code stored in the registry and returned to clients.
    pub fn code(self) -> &'static str {
        match self {
            RevocationReason::Rotated => "ROTATED",
            RevocationReason::UserLogout => "USER_LOGOUT",
            RevocationReason::LoggedOutElsewhere => "LOGGED_OUT_ELSEWHERE",
            RevocationReason::MaxSessionsExceeded => "MAX_SESSIONS_EXCEEDED",
            RevocationReason::AdminRevoked => "ADMIN_REVOKED",
            RevocationReason::PasswordChanged => "PASSWORD_CHANGED",
            RevocationReason::SecurityIncident => "SECURITY_INCIDENT",
        }
    }

    /// The error kind an authentication attempt with a token revoked for
    /// this reason is rejected with.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            RevocationReason::Rotated => ErrorKind::SessionExpired,
            RevocationReason::MaxSessionsExceeded => ErrorKind::MaxSessionsExceeded,
            RevocationReason::UserLogout
            | RevocationReason::LoggedOutElsewhere
            | RevocationReason::AdminRevoked
            | RevocationReason::PasswordChanged
            | RevocationReason::SecurityIncident => ErrorKind::SessionRevoked,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RevocationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROTATED" => Ok(RevocationReason::Rotated),
            "USER_LOGOUT" => Ok(RevocationReason::UserLogout),
            "LOGGED_OUT_ELSEWHERE" => Ok(RevocationReason::LoggedOutElsewhere),
            "MAX_SESSIONS_EXCEEDED" => Ok(RevocationReason::MaxSessionsExceeded),
            "ADMIN_REVOKED" => Ok(RevocationReason::AdminRevoked),
            "PASSWORD_CHANGED" => Ok(RevocationReason::PasswordChanged),
            "SECURITY_INCIDENT" => Ok(RevocationReason::SecurityIncident),
            other => Err(format!("unknown revocation reason: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_from_str() {
        for reason in [
            RevocationReason::Rotated,
            RevocationReason::UserLogout,
            RevocationReason::LoggedOutElsewhere,
            RevocationReason::MaxSessionsExceeded,
            RevocationReason::AdminRevoked,
            RevocationReason::PasswordChanged,
            RevocationReason::SecurityIncident,
        ] {
            assert_eq!(reason.code().parse::<RevocationReason>(), Ok(reason));
        }
        assert!("NOPE".parse::<RevocationReason>().is_err());
    }

    #[test]
    fn reasons_map_to_distinct_client_kinds() {
        assert_eq!(RevocationReason::Rotated.error_kind(), ErrorKind::SessionExpired);
        assert_eq!(
            RevocationReason::MaxSessionsExceeded.error_kind(),
            ErrorKind::MaxSessionsExceeded
        );
        assert_eq!(RevocationReason::AdminRevoked.error_kind(), ErrorKind::SessionRevoked);
    }

    #[test]
    fn serde_matches_code() {
        let json = serde_json::to_string(&RevocationReason::PasswordChanged).unwrap();
        assert_eq!(json, format!("\"{}\"", RevocationReason::PasswordChanged.code()));
    }
}
