//! Clock sources for deterministic test data.
//!
//! Anything that derives identifiers from "now" (the default e-mail of
//! [`UserBuilder`](crate::UserBuilder)) reads a [`Clock`] instead of the
//! system time, so tests can pin or advance time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::result::{HarnessError, HarnessResult};

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Fake clock for deterministic tests.
///
/// Time only moves when told to.
#[derive(Debug, Default)]
pub struct FakeClock {
    current_ms: AtomicU64,
}

impl FakeClock {
    /// Create a clock frozen at `time_ms`
    #[must_use]
    pub const fn new(time_ms: u64) -> Self {
        Self {
            current_ms: AtomicU64::new(time_ms),
        }
    }

    /// Create a clock frozen at an RFC 3339 timestamp (e.g. `2024-01-15T10:00:00Z`)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the timestamp cannot be parsed or
    /// predates the Unix epoch
    pub fn from_rfc3339(timestamp: &str) -> HarnessResult<Self> {
        let parsed = DateTime::parse_from_rfc3339(timestamp.trim()).map_err(|e| {
            HarnessError::Config {
                message: format!("invalid timestamp {timestamp:?}: {e}"),
            }
        })?;
        let time_ms =
            u64::try_from(parsed.timestamp_millis()).map_err(|_| HarnessError::Config {
                message: format!("timestamp {timestamp:?} predates the Unix epoch"),
            })?;
        Ok(Self::new(time_ms))
    }

    /// Set clock to a fixed time
    pub fn set_fixed_time(&self, time_ms: u64) {
        self.current_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Fast-forward time by duration
    pub fn fast_forward(&self, duration: Duration) {
        let _ = self
            .current_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Fast-forward time by milliseconds
    pub fn fast_forward_ms(&self, ms: u64) {
        self.fast_forward(Duration::from_millis(ms));
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}

impl Clone for FakeClock {
    fn clone(&self) -> Self {
        Self::new(self.now_ms())
    }
}
