//! Wait mechanisms.
//!
//! Async polling with a deadline, plus a network-activity tracker that
//! answers "has the page been quiet for N milliseconds?". Waits use
//! `tokio::time` so paused-clock tests advance instantly.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{trace, warn};

use crate::config::{DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::result::{HarnessError, HarnessResult};

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value produced by the final probe
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of probes issued
    pub attempts: u32,
}

/// Probe until it yields a value or the timeout expires.
///
/// The probe is always issued at least once. Probe errors abort the wait
/// and are returned unchanged.
pub async fn poll_until<T, F, Fut>(
    options: &WaitOptions,
    waited_for: &str,
    mut probe: F,
) -> HarnessResult<WaitResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            trace!(waited_for, attempts, "wait satisfied");
            return Ok(WaitResult {
                value,
                elapsed: start.elapsed(),
                attempts,
            });
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(waited_for, attempts, timeout_ms = options.timeout_ms, "wait timed out");
            return Err(HarnessError::timeout(waited_for, options.timeout()));
        }
        let nap = options.poll_interval().min(deadline - now);
        tokio::time::sleep(nap).await;
    }
}

// =============================================================================
// NETWORK ACTIVITY
// =============================================================================

#[derive(Debug, Default)]
struct ActivityState {
    pending_requests: usize,
    last_activity: Option<Instant>,
}

/// Tracks in-flight requests to decide when the network is quiescent.
///
/// The network is idle when nothing is pending and no activity has been
/// recorded for the quiet interval.
#[derive(Debug, Default)]
pub struct NetworkActivity {
    state: Mutex<ActivityState>,
}

impl NetworkActivity {
    /// Create an idle tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request that completed immediately
    pub fn record(&self) {
        let mut state = self.lock();
        state.last_activity = Some(Instant::now());
    }

    /// Record a request starting
    pub fn begin_request(&self) {
        let mut state = self.lock();
        state.pending_requests += 1;
        state.last_activity = Some(Instant::now());
    }

    /// Record a request finishing
    pub fn end_request(&self) {
        let mut state = self.lock();
        state.pending_requests = state.pending_requests.saturating_sub(1);
        state.last_activity = Some(Instant::now());
    }

    /// Number of requests still in flight
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.lock().pending_requests
    }

    /// Check if the network has been quiet for `quiet`
    #[must_use]
    pub fn is_idle(&self, quiet: Duration) -> bool {
        let state = self.lock();
        if state.pending_requests > 0 {
            return false;
        }
        state
            .last_activity
            .map_or(true, |last| last.elapsed() >= quiet)
    }

    /// Wait until the network has been quiet for `quiet`, bounded by `timeout`
    pub async fn wait_for_idle(&self, quiet: Duration, timeout: Duration) -> HarnessResult<()> {
        let options = WaitOptions::new()
            .with_timeout(timeout.as_millis() as u64)
            .with_poll_interval(quiet.as_millis().clamp(1, 50) as u64);
        poll_until(&options, "network idle", move || async move {
            Ok(self.is_idle(quiet).then_some(()))
        })
        .await?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActivityState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
