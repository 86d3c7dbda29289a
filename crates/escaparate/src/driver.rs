//! Driver - Abstract Browser Automation Trait
//!
//! Page objects never talk to a browser directly. They go through the
//! [`Driver`] trait, which captures the small capability set the core needs:
//! navigation, network-idle detection, element resolution and a handful of
//! element actions and reads.
//!
//! # Implementations
//!
//! - [`MockDriver`] - scripted and recording, for unit tests
//! - [`StorefrontDriver`](crate::StorefrontDriver) - in-memory storefront simulation
//! - `ChromiumDriver` - real browser over CDP (feature `browser`)
//!
//! Every method takes `&self`; implementations use interior mutability so a
//! single driver can back several page objects of one session.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::{HarnessError, HarnessResult};

/// PNG file signature, written by test drivers as screenshot payload
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Reference to one element matched by a selector at resolution time.
///
/// Handles are positional: they name the `index`-th match of `selector`
/// and go stale as soon as the DOM changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Selector that produced this handle
    pub selector: String,
    /// Position among the selector's matches
    pub index: usize,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

/// The elements a selector matched at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSet {
    selector: String,
    handles: Vec<ElementHandle>,
}

impl ElementSet {
    /// Build a set of `count` positional handles for `selector`
    #[must_use]
    pub fn from_count(selector: impl Into<String>, count: usize) -> Self {
        let selector = selector.into();
        let handles = (0..count)
            .map(|index| ElementHandle::new(selector.clone(), index))
            .collect();
        Self { selector, handles }
    }

    /// An empty match
    #[must_use]
    pub fn empty(selector: impl Into<String>) -> Self {
        Self::from_count(selector, 0)
    }

    /// Selector this set was resolved from
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Number of matches
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// First match, if any
    #[must_use]
    pub fn first(&self) -> Option<&ElementHandle> {
        self.handles.first()
    }

    /// Iterate over the matches
    pub fn iter(&self) -> std::slice::Iter<'_, ElementHandle> {
        self.handles.iter()
    }
}

/// Abstract driver trait for browser automation.
///
/// Implementations surface their own failures as [`HarnessError`]; the core
/// never retries or downgrades them.
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Load a URL
    async fn goto_url(&self, url: &str) -> HarnessResult<()>;

    /// Resolve once the page has had no network activity for `quiet`.
    /// `timeout` bounds the wait.
    async fn wait_until_network_idle(&self, quiet: Duration, timeout: Duration)
        -> HarnessResult<()>;

    /// Current page URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// Current document title
    async fn title(&self) -> HarnessResult<String>;

    /// Capture the viewport as PNG to `path`
    async fn screenshot(&self, path: &Path) -> HarnessResult<()>;

    /// Resolve a CSS selector against the current DOM
    async fn resolve(&self, selector: &str) -> HarnessResult<ElementSet>;

    /// Replace the value of an input element
    async fn fill(&self, handle: &ElementHandle, text: &str) -> HarnessResult<()>;

    /// Click an element
    async fn click(&self, handle: &ElementHandle) -> HarnessResult<()>;

    /// Text content of an element (`None` when the element has none)
    async fn text_content(&self, handle: &ElementHandle) -> HarnessResult<Option<String>>;

    /// Whether an element is rendered and visible
    async fn is_visible(&self, handle: &ElementHandle) -> HarnessResult<bool>;

    /// Whether an element accepts interaction
    async fn is_enabled(&self, handle: &ElementHandle) -> HarnessResult<bool>;

    /// Live number of elements matching a selector
    async fn count(&self, selector: &str) -> HarnessResult<usize>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Canned element served by [`MockDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Text content
    pub text: Option<String>,
    /// Current input value
    pub value: String,
    /// Visible flag
    pub visible: bool,
    /// Enabled flag
    pub enabled: bool,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            text: None,
            value: String::new(),
            visible: true,
            enabled: true,
        }
    }
}

impl MockElement {
    /// A visible, enabled element without text
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Mark as hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    current_url: String,
    title: String,
    elements: HashMap<String, Vec<MockElement>>,
    navigation_failure: Option<String>,
    call_history: Vec<String>,
}

/// Mock driver for unit testing.
///
/// Serves canned elements keyed by exact selector string and records every
/// action (`goto:`, `wait_until_network_idle`, `fill:`, `click:`,
/// `screenshot:`) in call order. Reads are not recorded.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document title
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.lock().title = title.into();
        self
    }

    /// Add an element matched by `selector`
    #[must_use]
    pub fn with_element(self, selector: impl Into<String>, element: MockElement) -> Self {
        self.add_element(selector, element);
        self
    }

    /// Add an element matched by `selector`
    pub fn add_element(&self, selector: impl Into<String>, element: MockElement) {
        self.lock()
            .elements
            .entry(selector.into())
            .or_default()
            .push(element);
    }

    /// Remove every element matched by `selector`
    pub fn remove_elements(&self, selector: &str) {
        let _ = self.lock().elements.remove(selector);
    }

    /// Make the next `goto_url` fail with a navigation error
    pub fn fail_next_navigation(&self, message: impl Into<String>) {
        self.lock().navigation_failure = Some(message.into());
    }

    /// Current value of the first element matched by `selector`
    #[must_use]
    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.lock()
            .elements
            .get(selector)
            .and_then(|els| els.first())
            .map(|el| el.value.clone())
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().call_history.iter().any(|c| c.starts_with(method))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_handle<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&mut MockElement) -> T,
    ) -> HarnessResult<T> {
        let mut state = self.lock();
        state
            .elements
            .get_mut(&handle.selector)
            .and_then(|els| els.get_mut(handle.index))
            .map(f)
            .ok_or_else(|| HarnessError::ElementNotFound {
                selector: handle.selector.clone(),
            })
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn goto_url(&self, url: &str) -> HarnessResult<()> {
        let mut state = self.lock();
        state.call_history.push(format!("goto:{url}"));
        if let Some(message) = state.navigation_failure.take() {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        state.current_url = url.to_string();
        Ok(())
    }

    async fn wait_until_network_idle(
        &self,
        _quiet: Duration,
        _timeout: Duration,
    ) -> HarnessResult<()> {
        self.lock()
            .call_history
            .push("wait_until_network_idle".to_string());
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.lock().current_url.clone())
    }

    async fn title(&self) -> HarnessResult<String> {
        Ok(self.lock().title.clone())
    }

    async fn screenshot(&self, path: &Path) -> HarnessResult<()> {
        self.lock()
            .call_history
            .push(format!("screenshot:{}", path.display()));
        tokio::fs::write(path, PNG_SIGNATURE).await?;
        Ok(())
    }

    async fn resolve(&self, selector: &str) -> HarnessResult<ElementSet> {
        let count = self.lock().elements.get(selector).map_or(0, Vec::len);
        Ok(ElementSet::from_count(selector, count))
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.with_handle(handle, |el| el.value = text.to_string())?;
        self.lock()
            .call_history
            .push(format!("fill:{}:{text}", handle.selector));
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> HarnessResult<()> {
        self.with_handle(handle, |_| ())?;
        self.lock()
            .call_history
            .push(format!("click:{}", handle.selector));
        Ok(())
    }

    async fn text_content(&self, handle: &ElementHandle) -> HarnessResult<Option<String>> {
        self.with_handle(handle, |el| el.text.clone())
    }

    async fn is_visible(&self, handle: &ElementHandle) -> HarnessResult<bool> {
        self.with_handle(handle, |el| el.visible)
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> HarnessResult<bool> {
        self.with_handle(handle, |el| el.enabled)
    }

    async fn count(&self, selector: &str) -> HarnessResult<usize> {
        Ok(self.lock().elements.get(selector).map_or(0, Vec::len))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod element_set_tests {
        use super::*;

        #[test]
        fn test_from_count() {
            let set = ElementSet::from_count(".inventory_item", 3);
            assert_eq!(set.len(), 3);
            assert_eq!(set.selector(), ".inventory_item");
            let indexes: Vec<usize> = set.iter().map(|h| h.index).collect();
            assert_eq!(indexes, vec![0, 1, 2]);
        }

        #[test]
        fn test_empty() {
            let set = ElementSet::empty("#missing");
            assert!(set.is_empty());
            assert!(set.first().is_none());
        }
    }

    mod mock_element_tests {
        use super::*;

        #[test]
        fn test_defaults_visible_enabled() {
            let el = MockElement::new();
            assert!(el.visible);
            assert!(el.enabled);
            assert!(el.text.is_none());
        }

        #[test]
        fn test_builders() {
            let el = MockElement::new().with_text("Products").hidden().disabled();
            assert_eq!(el.text.as_deref(), Some("Products"));
            assert!(!el.visible);
            assert!(!el.enabled);
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[test]
        fn test_mock_driver_creation() {
            let driver = MockDriver::new();
            assert!(driver.history().is_empty());
            assert!(!driver.was_called("goto"));
        }

        #[tokio::test]
        async fn test_navigate_records_and_sets_url() {
            let driver = MockDriver::new();
            driver.goto_url("https://example.com/").await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "https://example.com/");
            assert!(driver.was_called("goto:https://example.com/"));
        }

        #[tokio::test]
        async fn test_navigation_failure_is_one_shot() {
            let driver = MockDriver::new();
            driver.fail_next_navigation("net::ERR_CONNECTION_REFUSED");

            let err = driver.goto_url("https://example.com/").await.unwrap_err();
            assert!(matches!(err, HarnessError::Navigation { .. }));
            assert!(driver.goto_url("https://example.com/").await.is_ok());
        }

        #[tokio::test]
        async fn test_fill_and_click() {
            let driver = MockDriver::new().with_element("#name", MockElement::new());
            let set = driver.resolve("#name").await.unwrap();
            let handle = set.first().unwrap();

            driver.fill(handle, "alice").await.unwrap();
            driver.click(handle).await.unwrap();

            assert_eq!(driver.value_of("#name").as_deref(), Some("alice"));
            assert_eq!(driver.history(), vec!["fill:#name:alice", "click:#name"]);
        }

        #[tokio::test]
        async fn test_stale_handle() {
            let driver = MockDriver::new().with_element("#gone", MockElement::new());
            let handle = ElementHandle::new("#gone", 0);
            driver.remove_elements("#gone");

            let err = driver.click(&handle).await.unwrap_err();
            assert!(matches!(err, HarnessError::ElementNotFound { .. }));
        }

        #[tokio::test]
        async fn test_reads() {
            let driver = MockDriver::new()
                .with_title("Swag Labs")
                .with_element(".title", MockElement::new().with_text("Products"))
                .with_element(".item", MockElement::new())
                .with_element(".item", MockElement::new().hidden());

            assert_eq!(driver.title().await.unwrap(), "Swag Labs");
            assert_eq!(driver.count(".item").await.unwrap(), 2);
            assert!(!driver
                .is_visible(&ElementHandle::new(".item", 1))
                .await
                .unwrap());
            assert_eq!(
                driver
                    .text_content(&ElementHandle::new(".title", 0))
                    .await
                    .unwrap()
                    .as_deref(),
                Some("Products")
            );
        }

        #[tokio::test]
        async fn test_screenshot_writes_png_signature() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("shot.png");
            MockDriver::new().screenshot(&path).await.unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), PNG_SIGNATURE);
        }
    }
}
