//! Progressive account-lockout policy.
//!
//! A policy is an ordered list of `(attempts, duration)` tiers. After each
//! counted failure the tiers are checked from the highest threshold down, so
//! crossing a higher threshold applies the longer lockout even when lower
//! thresholds were passed on the way.

use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// Default extra lifetime of the failure counter beyond the longest lockout.
pub const DEFAULT_COUNTER_BUFFER: Duration = Duration::from_secs(300);

/// One escalation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutTier {
    /// Failure count at which this tier triggers.
    pub attempts: u32,
    /// How long the account stays locked once triggered.
    pub duration: Duration,
}

/// Ordered lockout tiers plus the counter TTL buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Sorted ascending by `attempts`, thresholds unique.
    tiers: Vec<LockoutTier>,
    counter_buffer: Duration,
}

impl LockoutPolicy {
    /// Build a policy, sorting tiers and rejecting empty, zero or duplicate thresholds.
    pub fn new(mut tiers: Vec<LockoutTier>, counter_buffer: Duration) -> Result<Self, CoreError> {
        if tiers.is_empty() {
            return Err(CoreError::Validation(
                "lockout policy needs at least one tier".into(),
            ));
        }
        if tiers.iter().any(|t| t.attempts == 0 || t.duration.is_zero()) {
            return Err(CoreError::Validation(
                "lockout tiers need non-zero attempts and duration".into(),
            ));
        }
        tiers.sort_by_key(|t| t.attempts);
        if tiers.windows(2).any(|w| w[0].attempts == w[1].attempts) {
            return Err(CoreError::Validation(
                "lockout tier thresholds must be unique".into(),
            ));
        }
        Ok(Self {
            tiers,
            counter_buffer,
        })
    }

    pub fn tiers(&self) -> &[LockoutTier] {
        &self.tiers
    }

    /// TTL of the failure counter: longest lockout plus the buffer.
    pub fn counter_ttl(&self) -> Duration {
        let longest = self
            .tiers
            .iter()
            .map(|t| t.duration)
            .max()
            .unwrap_or_default();
        longest + self.counter_buffer
    }

    /// The tier triggered by `failures`, checked from the highest threshold down.
    pub fn tier_for(&self, failures: u32) -> Option<LockoutTier> {
        self.tiers
            .iter()
            .rev()
            .find(|t| failures >= t.attempts)
            .copied()
    }
}

impl Default for LockoutPolicy {
    /// `[(5, 15 min), (10, 1 hour)]` with a five-minute counter buffer.
    fn default() -> Self {
        Self {
            tiers: vec![
                LockoutTier {
                    attempts: 5,
                    duration: Duration::from_secs(15 * 60),
                },
                LockoutTier {
                    attempts: 10,
                    duration: Duration::from_secs(60 * 60),
                },
            ],
            counter_buffer: DEFAULT_COUNTER_BUFFER,
        }
    }
}

/// Parse `"5:900,10:3600"` into tiers (`attempts:seconds`, comma separated).
pub fn parse_tiers(raw: &str) -> Result<Vec<LockoutTier>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (attempts, secs) = pair.split_once(':').ok_or_else(|| {
                CoreError::Validation(format!("lockout tier '{pair}' must be attempts:seconds"))
            })?;
            let attempts = u32::from_str(attempts.trim()).map_err(|e| {
                CoreError::Validation(format!("lockout tier '{pair}' attempts: {e}"))
            })?;
            let secs = u64::from_str(secs.trim()).map_err(|e| {
                CoreError::Validation(format!("lockout tier '{pair}' seconds: {e}"))
            })?;
            Ok(LockoutTier {
                attempts,
                duration: Duration::from_secs(secs),
            })
        })
        .collect()
}

/// What the lockout counter does when its backing store fails.
///
/// There is no implicit choice: the deployment picks one in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockoutFailurePolicy {
    /// Treat the account as not locked (a cache outage cannot lock everyone out).
    #[default]
    TreatAsUnlocked,
    /// Treat the account as locked (an outage cannot be used to bypass lockout).
    TreatAsLocked,
}

impl FromStr for LockoutFailurePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unlocked" => Ok(LockoutFailurePolicy::TreatAsUnlocked),
            "locked" => Ok(LockoutFailurePolicy::TreatAsLocked),
            other => Err(CoreError::Validation(format!(
                "LOCKOUT_STORE_FAILURE must be 'unlocked' or 'locked', got '{other}'"
            ))),
        }
    }
}
