//! Locator abstraction for element selection and interaction.
//!
//! # Design Philosophy
//!
//! - **Declarative**: a [`Locator`] is fixed at construction and immutable
//! - **Lazy**: it is resolved against the live DOM on every use, never cached
//! - **Auto-Waiting**: actions wait for the element to be actionable
//!   (attached, visible, enabled) within the session's action timeout
//!
//! Reads (`text_content`, `is_visible`, `count`) never wait: an absent
//! element is an answer, not an error.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::ElementHandle;
use crate::result::{HarnessError, HarnessResult};
use crate::session::Session;
use crate::wait::poll_until;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Test ID selector (`data-test` attribute)
    TestId(String),
    /// Element id
    Id(String),
    /// Class name
    Class(String),
    /// Raw CSS selector (e.g. "button.primary")
    Css(String),
}

impl Selector {
    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a class selector
    #[must_use]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Convert to the CSS selector handed to the driver
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::TestId(id) => format!("[data-test={id:?}]"),
            Self::Id(id) => format!("#{id}"),
            Self::Class(class) => format!(".{class}"),
            Self::Css(css) => css.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// A lazily resolved reference to page elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    css: String,
}

impl Locator {
    /// Create a locator from a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::css(selector))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        let css = selector.to_css();
        Self { selector, css }
    }

    /// Locator for a `data-test` attribute
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Locator for an element id
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::id(id))
    }

    /// Locator for a class name
    #[must_use]
    pub fn class(class: impl Into<String>) -> Self {
        Self::from_selector(Selector::class(class))
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// CSS form of the selector
    #[must_use]
    pub fn css(&self) -> &str {
        &self.css
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Replace the element's value once it is actionable
    ///
    /// # Errors
    ///
    /// `ElementNotFound` if nothing matched before the action timeout,
    /// `Timeout` if the element matched but never became actionable
    pub async fn fill(&self, session: &Session, text: &str) -> HarnessResult<()> {
        let operation = format!("fill {}", self.css);
        session
            .run(&operation, action_bound(session), async {
                let handle = self.wait_actionable(session, &operation).await?;
                debug!(selector = %self.css, chars = text.chars().count(), "fill");
                session.driver().fill(&handle, text).await
            })
            .await
    }

    /// Click the element once it is actionable
    ///
    /// # Errors
    ///
    /// Same as [`fill`](Self::fill)
    pub async fn click(&self, session: &Session) -> HarnessResult<()> {
        let operation = format!("click {}", self.css);
        session
            .run(&operation, action_bound(session), async {
                let handle = self.wait_actionable(session, &operation).await?;
                debug!(selector = %self.css, "click");
                session.driver().click(&handle).await
            })
            .await
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Text of the first match, `None` when nothing matches
    ///
    /// # Errors
    ///
    /// Driver failures, timeouts, `SessionClosed`
    pub async fn text_content(&self, session: &Session) -> HarnessResult<Option<String>> {
        let operation = format!("text_content {}", self.css);
        session
            .run(&operation, session.config().action_timeout(), async {
                let driver = session.driver();
                let matches = driver.resolve(&self.css).await?;
                match matches.first() {
                    Some(handle) => driver.text_content(handle).await,
                    None => Ok(None),
                }
            })
            .await
    }

    /// Whether the first match is visible; `false` when nothing matches
    ///
    /// # Errors
    ///
    /// Driver failures, timeouts, `SessionClosed`
    pub async fn is_visible(&self, session: &Session) -> HarnessResult<bool> {
        let operation = format!("is_visible {}", self.css);
        session
            .run(&operation, session.config().action_timeout(), async {
                let driver = session.driver();
                let matches = driver.resolve(&self.css).await?;
                match matches.first() {
                    Some(handle) => driver.is_visible(handle).await,
                    None => Ok(false),
                }
            })
            .await
    }

    /// Whether the first match is enabled, waiting for it to be attached
    ///
    /// # Errors
    ///
    /// `ElementNotFound` if nothing matched before the action timeout
    pub async fn is_enabled(&self, session: &Session) -> HarnessResult<bool> {
        let operation = format!("is_enabled {}", self.css);
        session
            .run(&operation, action_bound(session), async {
                let handle = self.wait_attached(session, &operation).await?;
                session.driver().is_enabled(&handle).await
            })
            .await
    }

    /// Live number of matches
    ///
    /// # Errors
    ///
    /// Driver failures, timeouts, `SessionClosed`
    pub async fn count(&self, session: &Session) -> HarnessResult<usize> {
        let operation = format!("count {}", self.css);
        session
            .run(
                &operation,
                session.config().action_timeout(),
                session.driver().count(&self.css),
            )
            .await
    }

    // =========================================================================
    // WAITING
    // =========================================================================

    async fn wait_attached(&self, session: &Session, operation: &str) -> HarnessResult<ElementHandle> {
        let driver = session.driver();
        let css = self.css.as_str();
        let waited = poll_until(&session.wait_options(), operation, move || async move {
            Ok(driver.resolve(css).await?.first().cloned())
        })
        .await;
        waited.map(|w| w.value).map_err(|e| self.not_found_on_timeout(e, false))
    }

    async fn wait_actionable(
        &self,
        session: &Session,
        operation: &str,
    ) -> HarnessResult<ElementHandle> {
        let driver = session.driver();
        let css = self.css.as_str();
        let seen = &AtomicBool::new(false);
        let waited = poll_until(&session.wait_options(), operation, move || async move {
            let Some(handle) = driver.resolve(css).await?.first().cloned() else {
                return Ok(None);
            };
            seen.store(true, Ordering::Relaxed);
            let actionable =
                driver.is_visible(&handle).await? && driver.is_enabled(&handle).await?;
            Ok(actionable.then_some(handle))
        })
        .await;
        waited
            .map(|w| w.value)
            .map_err(|e| self.not_found_on_timeout(e, seen.load(Ordering::Relaxed)))
    }

    fn not_found_on_timeout(&self, err: HarnessError, seen: bool) -> HarnessError {
        if err.is_timeout() && !seen {
            HarnessError::ElementNotFound {
                selector: self.css.clone(),
            }
        } else {
            err
        }
    }
}

/// The outer bound leaves room for the final readiness probe.
fn action_bound(session: &Session) -> std::time::Duration {
    let options = session.wait_options();
    options.timeout() + options.poll_interval()
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css)
    }
}
