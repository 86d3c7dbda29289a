//! Result and error types for Escaparate.
//!
//! Collaborator errors are propagated unchanged. Storefront outcomes that
//! only *look* like failures (bad credentials, locked accounts, empty
//! fields) are never errors: page objects expose them as observable state.

use std::time::Duration;

use thiserror::Error;

use crate::page_object::PageState;

/// Result type for Escaparate operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a storefront session
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Navigation did not settle within the navigation timeout
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Selector resolved to zero elements when one was required
    #[error("No element matches selector {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// An implicit wait expired
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Underlying automation failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Page operation issued before the page reached `Loaded`
    #[error("{page} is not ready (state: {state}); call navigate() or wait_for_page_load() first")]
    NotReady {
        /// Page name
        page: &'static str,
        /// State the page was in
        state: PageState,
    },

    /// The owning session was closed while the operation was pending
    #[error("Session closed")]
    SessionClosed,

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// HTTP transport error
    #[cfg(feature = "api")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarnessError {
    /// Build a driver error from anything printable
    pub fn driver(message: impl std::fmt::Display) -> Self {
        Self::Driver {
            message: message.to_string(),
        }
    }

    /// Build a timeout error for an operation
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms: after.as_millis() as u64,
        }
    }

    /// Whether this error is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
