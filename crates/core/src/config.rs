//! Immutable authentication configuration.
//!
//! Built once at process start and shared behind an `Arc`; nothing in the
//! session core reads the environment after startup.

use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;
use crate::lockout::{parse_tiers, LockoutFailurePolicy, LockoutPolicy, DEFAULT_COUNTER_BUFFER};

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: u64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: u64 = 7;
/// Default cap on concurrently active sessions per user.
const DEFAULT_MAX_SESSIONS: usize = 5;
/// Default timeout for a single store call in milliseconds.
const DEFAULT_STORE_TIMEOUT_MS: u64 = 500;
/// Upper bound on either token lifetime.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Signing, expiry, session-cap and lockout settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret for access tokens.
    pub access_secret: String,
    /// HMAC-SHA256 secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock-skew tolerance applied to `exp` / `nbf` checks.
    pub leeway: Duration,
    /// Maximum active sessions per user; the oldest are evicted beyond it.
    pub max_concurrent_sessions: usize,
    pub lockout: LockoutPolicy,
    pub lockout_store_failure: LockoutFailurePolicy,
    /// Timeout applied to every session store and key-value call.
    pub store_timeout: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway", &self.leeway)
            .field("max_concurrent_sessions", &self.max_concurrent_sessions)
            .field("lockout", &self.lockout)
            .field("lockout_store_failure", &self.lockout_store_failure)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl AuthConfig {
    /// Configuration with the documented defaults and the given secrets.
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            issuer: "warden".into(),
            audience: "warden-api".into(),
            access_ttl: Duration::from_secs(DEFAULT_ACCESS_EXPIRY_MINS * 60),
            refresh_ttl: Duration::from_secs(DEFAULT_REFRESH_EXPIRY_DAYS * 24 * 60 * 60),
            leeway: Duration::ZERO,
            max_concurrent_sessions: DEFAULT_MAX_SESSIONS,
            lockout: LockoutPolicy::default(),
            lockout_store_failure: LockoutFailurePolicy::default(),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                       | Required | Default          |
    /// |-------------------------------|----------|------------------|
    /// | `JWT_ACCESS_SECRET`           | **yes**  | --               |
    /// | `JWT_REFRESH_SECRET`          | **yes**  | --               |
    /// | `JWT_ISSUER`                  | no       | `warden`         |
    /// | `JWT_AUDIENCE`                | no       | `warden-api`     |
    /// | `JWT_ACCESS_EXPIRY_MINS`      | no       | `15`             |
    /// | `JWT_REFRESH_EXPIRY_DAYS`     | no       | `7`              |
    /// | `JWT_LEEWAY_SECS`             | no       | `0`              |
    /// | `MAX_CONCURRENT_SESSIONS`     | no       | `5`              |
    /// | `LOCKOUT_TIERS`               | no       | `5:900,10:3600`  |
    /// | `LOCKOUT_COUNTER_BUFFER_SECS` | no       | `300`            |
    /// | `LOCKOUT_STORE_FAILURE`       | no       | `unlocked`       |
    /// | `STORE_TIMEOUT_MS`            | no       | `500`            |
    pub fn from_env() -> Result<Self, CoreError> {
        let access_secret = required("JWT_ACCESS_SECRET")?;
        let refresh_secret = required("JWT_REFRESH_SECRET")?;

        let mut config = Self::with_secrets(access_secret, refresh_secret);

        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            config.issuer = issuer;
        }
        if let Ok(audience) = std::env::var("JWT_AUDIENCE") {
            config.audience = audience;
        }

        let access_mins: u64 = parsed("JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS)?;
        let refresh_days: u64 = parsed("JWT_REFRESH_EXPIRY_DAYS", DEFAULT_REFRESH_EXPIRY_DAYS)?;
        config.access_ttl = access_mins
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| CoreError::Validation("JWT_ACCESS_EXPIRY_MINS is too large".into()))?;
        config.refresh_ttl = refresh_days
            .checked_mul(24 * 60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(|| CoreError::Validation("JWT_REFRESH_EXPIRY_DAYS is too large".into()))?;
        config.leeway = Duration::from_secs(parsed("JWT_LEEWAY_SECS", 0u64)?);
        config.max_concurrent_sessions = parsed("MAX_CONCURRENT_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        config.store_timeout =
            Duration::from_millis(parsed("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?);

        let buffer = Duration::from_secs(parsed(
            "LOCKOUT_COUNTER_BUFFER_SECS",
            DEFAULT_COUNTER_BUFFER.as_secs(),
        )?);
        config.lockout = match std::env::var("LOCKOUT_TIERS") {
            Ok(raw) => LockoutPolicy::new(parse_tiers(&raw)?, buffer)?,
            Err(_) => LockoutPolicy::new(LockoutPolicy::default().tiers().to_vec(), buffer)?,
        };
        if let Ok(policy) = std::env::var("LOCKOUT_STORE_FAILURE") {
            config.lockout_store_failure = policy.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(CoreError::Validation("JWT secrets must not be empty".into()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(CoreError::Validation(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".into(),
            ));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(CoreError::Validation(
                "MAX_CONCURRENT_SESSIONS must be at least 1".into(),
            ));
        }
        if self.access_ttl.is_zero() || self.refresh_ttl.is_zero() {
            return Err(CoreError::Validation("token lifetimes must be non-zero".into()));
        }
        if self.access_ttl > MAX_TOKEN_TTL || self.refresh_ttl > MAX_TOKEN_TTL {
            return Err(CoreError::Validation(format!(
                "token lifetimes must not exceed {} days",
                MAX_TOKEN_TTL.as_secs() / 86_400
            )));
        }
        Ok(())
    }
}

fn required(name: &str) -> Result<String, CoreError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(CoreError::Validation(format!("{name} must be set and non-empty"))),
    }
}

fn parsed<T>(name: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Validation(format!("{name} is invalid: {e}"))),
        Err(_) => Ok(default),
    }
}
