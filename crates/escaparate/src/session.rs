//! Browser sessions.
//!
//! A [`Session`] binds one driver to one test: it carries the driver, the
//! [`HarnessConfig`] every implicit wait reads its timeout from, and a close
//! signal that every in-flight operation races against.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::driver::Driver;
use crate::result::{HarnessError, HarnessResult};
use crate::wait::WaitOptions;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

struct SessionInner {
    id: u64,
    driver: Arc<dyn Driver>,
    config: HarnessConfig,
    closed: watch::Sender<bool>,
}

/// Handle to an open browser session.
///
/// Cloning is cheap and yields a handle to the same session, so several
/// page objects of one test can share it. Once [`close`](Self::close) is
/// called every operation through any handle fails with
/// [`HarnessError::SessionClosed`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("base_url", &self.inner.config.base_url)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session over a driver
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, config: HarnessConfig) -> Self {
        let (closed, _) = watch::channel(false);
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, base_url = %config.base_url, "session opened");
        Self {
            inner: Arc::new(SessionInner {
                id,
                driver,
                config,
                closed,
            }),
        }
    }

    /// Run `body` with a fresh session, closing it on every exit path.
    ///
    /// The session is closed when `body` returns, fails, or unwinds.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid `config`, otherwise
    /// whatever `body` returns
    pub async fn scoped<F, Fut, T>(
        driver: Arc<dyn Driver>,
        config: HarnessConfig,
        body: F,
    ) -> HarnessResult<T>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = HarnessResult<T>>,
    {
        config.validate()?;
        let session = Self::new(driver, config);
        let _guard = CloseGuard(session.clone());
        body(session).await
    }

    /// Unique session id (for log correlation)
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The driver backing this session
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.inner.driver.as_ref()
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.inner.config
    }

    /// Absolute URL for a path on the storefront
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        self.inner.config.url_for(path)
    }

    /// Wait options for element readiness, from the action timeout
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.inner.config.action_timeout_ms)
            .with_poll_interval(self.inner.config.poll_interval_ms)
    }

    /// Close the session. Idempotent.
    pub fn close(&self) {
        let was_closed = self.inner.closed.send_replace(true);
        if !was_closed {
            info!(session = self.inner.id, "session closed");
        }
    }

    /// Whether the session has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Run one operation against the session.
    ///
    /// Fails with [`HarnessError::SessionClosed`] if the session is (or
    /// becomes) closed, and with [`HarnessError::Timeout`] if `fut` has not
    /// finished within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the error of `fut`, a timeout, or `SessionClosed`
    pub async fn run<T, F>(&self, operation: &str, timeout: Duration, fut: F) -> HarnessResult<T>
    where
        F: Future<Output = HarnessResult<T>>,
    {
        if self.is_closed() {
            return Err(HarnessError::SessionClosed);
        }
        let mut closed = self.inner.closed.subscribe();

        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => {
                debug!(session = self.inner.id, operation, "aborted by session close");
                Err(HarnessError::SessionClosed)
            }
            outcome = tokio::time::timeout(timeout, fut) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        session = self.inner.id,
                        operation,
                        timeout_ms = timeout.as_millis() as u64,
                        "operation timed out"
                    );
                    Err(HarnessError::timeout(operation, timeout))
                }
            },
        }
    }
}

struct CloseGuard(Session);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}
