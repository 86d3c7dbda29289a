//! Page Object Model support.
//!
//! A page object encapsulates one screen of the storefront: its path, its
//! locators and the operations a test performs on it. Screens implement the
//! [`PageObject`] capability trait; the behaviour every screen shares
//! (navigation, readiness, title, screenshots) lives in the composed
//! [`PageContext`] helper each page owns.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --navigate()--> Loading --network idle--> Loaded
//!       ^                          |
//!       +------ failed load -------+
//! ```
//!
//! Interactions fail fast with [`HarnessError::NotReady`] unless the page is
//! currently `Loaded`. The title and URL reads only need the page to have
//! loaded once. `navigate()`, `wait_for_page_load()` and `take_screenshot()`
//! work in any state.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::result::{HarnessError, HarnessResult};
use crate::session::Session;

// =============================================================================
// PAGE STATE
// =============================================================================

/// Lifecycle state of a page object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PageState {
    /// Not navigated yet (or the last load failed)
    Uninitialized = 0,
    /// Navigation in progress
    Loading = 1,
    /// Loaded and network-idle
    Loaded = 2,
}

impl PageState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Loading,
            2 => Self::Loaded,
            _ => Self::Uninitialized,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        };
        f.write_str(name)
    }
}

// =============================================================================
// URL PATTERN
// =============================================================================

/// URL pattern used to decide which screen the browser is on
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Site root, with or without a trailing `/`
    Root(String),
    /// Glob pattern where `*` matches any run of characters (e.g. `*/inventory.html`)
    Glob(String),
    /// Regex match
    Regex(Regex),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Exact URL match
    #[must_use]
    pub fn exact(url: impl Into<String>) -> Self {
        Self::Exact(url.into())
    }

    /// Prefix match
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// The storefront entry screen at `base_url`
    #[must_use]
    pub fn root(base_url: &str) -> Self {
        Self::Root(base_url.trim_end_matches('/').to_string())
    }

    /// Glob match with `*` wildcards
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    /// Regex match
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `pattern` is not a valid regex
    pub fn regex(pattern: &str) -> HarnessResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| HarnessError::Config {
                message: format!("invalid URL pattern {pattern:?}: {e}"),
            })
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Root(base) => url
                .strip_prefix(base.as_str())
                .is_some_and(|rest| rest.is_empty() || rest == "/"),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Regex(regex) => regex.is_match(url),
            Self::Any => true,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Glob(s) => f.write_str(s),
            Self::Root(base) => write!(f, "{base}/"),
            Self::Regex(regex) => f.write_str(regex.as_str()),
            Self::Any => f.write_str("*"),
        }
    }
}

/// `*` matches any run of characters, everything else is literal
fn glob_matches(pattern: &str, url: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(head) = parts.next() else {
        return url.is_empty();
    };
    let Some(mut rest) = url.strip_prefix(head) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(found) => rest = &rest[found + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

// =============================================================================
// PAGE CONTEXT
// =============================================================================

/// Shared state and behaviour composed into every page object.
#[derive(Debug)]
pub struct PageContext {
    session: Session,
    name: &'static str,
    path: &'static str,
    state: AtomicU8,
    loaded_once: AtomicBool,
}

impl PageContext {
    /// Create a context for the page `name` served at `path`
    #[must_use]
    pub fn new(session: Session, name: &'static str, path: &'static str) -> Self {
        Self {
            session,
            name,
            path,
            state: AtomicU8::new(PageState::Uninitialized as u8),
            loaded_once: AtomicBool::new(false),
        }
    }

    /// The owning session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Page name (for logs and errors)
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Path of the screen relative to the base URL
    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    /// Absolute URL of the screen
    #[must_use]
    pub fn url(&self) -> String {
        self.session.url_for(self.path)
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> PageState {
        PageState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the page has reached `Loaded` at least once
    #[must_use]
    pub fn has_loaded(&self) -> bool {
        self.loaded_once.load(Ordering::Acquire)
    }

    fn set_state(&self, state: PageState) {
        if state == PageState::Loaded {
            self.loaded_once.store(true, Ordering::Release);
        }
        let previous = PageState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            debug!(page = self.name, from = %previous, to = %state, "page state");
        }
    }

    /// The screen was left through a client-side transition
    pub(crate) fn mark_unloaded(&self) {
        self.set_state(PageState::Uninitialized);
    }

    /// Fail with `NotReady` unless the page is loaded
    ///
    /// # Errors
    ///
    /// [`HarnessError::NotReady`] when the page is not `Loaded`
    pub fn ensure_loaded(&self) -> HarnessResult<()> {
        match self.state() {
            PageState::Loaded => Ok(()),
            state => Err(HarnessError::NotReady {
                page: self.name,
                state,
            }),
        }
    }

    /// Fail with `NotReady` unless the page has ever been loaded
    ///
    /// # Errors
    ///
    /// [`HarnessError::NotReady`] before the first successful load
    pub fn ensure_loaded_once(&self) -> HarnessResult<()> {
        if self.has_loaded() {
            return Ok(());
        }
        Err(HarnessError::NotReady {
            page: self.name,
            state: self.state(),
        })
    }

    /// Load the screen URL and wait for the network to settle.
    ///
    /// A load that does not settle within the navigation timeout is a
    /// [`HarnessError::Navigation`]; the page returns to `Uninitialized`.
    ///
    /// # Errors
    ///
    /// Navigation, driver or session errors
    pub async fn navigate(&self) -> HarnessResult<()> {
        let url = self.url();
        info!(page = self.name, url = %url, "navigate");
        self.set_state(PageState::Loading);

        let timeout = self.session.config().navigation_timeout();
        let outcome = async {
            self.session
                .run(&format!("goto {url}"), timeout, self.session.driver().goto_url(&url))
                .await?;
            self.settle().await
        }
        .await;

        match outcome {
            Ok(()) => {
                self.set_state(PageState::Loaded);
                Ok(())
            }
            Err(err) => {
                self.set_state(PageState::Uninitialized);
                if err.is_timeout() {
                    Err(HarnessError::Navigation {
                        message: err.to_string(),
                        url,
                    })
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Wait for the network to go quiet, then mark the page loaded.
    ///
    /// Allowed in any state; this is how a page observes a transition it
    /// did not initiate (e.g. landing on the inventory after a login).
    ///
    /// # Errors
    ///
    /// `Timeout` if the network does not settle within the navigation
    /// timeout, driver or session errors
    pub async fn wait_for_page_load(&self) -> HarnessResult<()> {
        self.settle().await?;
        self.set_state(PageState::Loaded);
        Ok(())
    }

    async fn settle(&self) -> HarnessResult<()> {
        let config = self.session.config();
        let timeout = config.navigation_timeout();
        self.session
            .run(
                "network idle",
                timeout,
                self.session
                    .driver()
                    .wait_until_network_idle(config.network_idle(), timeout),
            )
            .await
    }

    /// Current document title
    ///
    /// # Errors
    ///
    /// `NotReady` before the first successful load, driver or session errors
    pub async fn title(&self) -> HarnessResult<String> {
        self.ensure_loaded_once()?;
        self.session
            .run(
                "title",
                self.session.config().action_timeout(),
                self.session.driver().title(),
            )
            .await
    }

    /// Current page URL
    ///
    /// # Errors
    ///
    /// `NotReady` before the first successful load, driver or session errors
    pub async fn current_url(&self) -> HarnessResult<String> {
        self.ensure_loaded_once()?;
        self.session
            .run(
                "current_url",
                self.session.config().action_timeout(),
                self.session.driver().current_url(),
            )
            .await
    }

    /// Save a PNG of the viewport to `<screenshot_dir>/<name>.png`.
    ///
    /// The directory is created if needed. Works in any page state. The
    /// name must be a plain file stem so the file stays inside the
    /// screenshot directory.
    ///
    /// # Errors
    ///
    /// `Config` for an empty name or one containing `/` or `\`, checked
    /// before the driver is called; otherwise I/O, driver or session errors
    pub async fn take_screenshot(&self, name: &str) -> HarnessResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(HarnessError::Config {
                message: format!("invalid screenshot name {name:?}"),
            });
        }
        let dir = &self.session.config().screenshot_dir;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{name}.png"));

        self.session
            .run(
                "screenshot",
                self.session.config().action_timeout(),
                self.session.driver().screenshot(&path),
            )
            .await?;
        info!(page = self.name, path = %path.display(), "screenshot saved");
        Ok(path)
    }
}

// =============================================================================
// PAGE OBJECT TRAIT
// =============================================================================

/// Capability trait for page objects.
///
/// Implementors provide their [`PageContext`] and URL pattern; everything
/// else has a default built on the context.
///
/// # Example
///
/// ```ignore
/// struct CheckoutPage {
///     ctx: PageContext,
///     continue_button: Locator,
/// }
///
/// impl PageObject for CheckoutPage {
///     fn context(&self) -> &PageContext {
///         &self.ctx
///     }
///
///     fn url_pattern(&self) -> UrlPattern {
///         UrlPattern::glob("*/checkout-step-one.html")
///     }
/// }
/// ```
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Shared page state
    fn context(&self) -> &PageContext;

    /// Pattern matching the URLs of this screen
    fn url_pattern(&self) -> UrlPattern;

    /// Load the screen and wait until it is ready
    async fn navigate(&self) -> HarnessResult<()> {
        self.context().navigate().await
    }

    /// Document title
    async fn get_title(&self) -> HarnessResult<String> {
        self.context().title().await
    }

    /// Current URL
    async fn get_current_url(&self) -> HarnessResult<String> {
        self.context().current_url().await
    }

    /// Wait for the quiescent network state and mark the page loaded
    async fn wait_for_page_load(&self) -> HarnessResult<()> {
        self.context().wait_for_page_load().await
    }

    /// Save a screenshot named `name`
    async fn take_screenshot(&self, name: &str) -> HarnessResult<PathBuf> {
        self.context().take_screenshot(name).await
    }

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &'static str {
        self.context().name()
    }

    /// Current lifecycle state
    fn state(&self) -> PageState {
        self.context().state()
    }
}
