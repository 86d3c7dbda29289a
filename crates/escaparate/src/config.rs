//! Harness configuration.
//!
//! One [`HarnessConfig`] is bound to each [`Session`](crate::Session) and is
//! the single source of every timeout the page objects use. It can be
//! built in code, loaded from YAML, and overridden from `ESCAPARATE_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::{HarnessError, HarnessResult};

/// Default storefront under test
pub const DEFAULT_BASE_URL: &str = "https://www.saucedemo.com";

/// Default JSON API under test
pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com";

/// Default timeout for navigation and load-state waits (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for element actions (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval for element readiness (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without requests)
pub const DEFAULT_NETWORK_IDLE_MS: u64 = 500;

/// Default timeout for API requests (30 seconds)
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Environment variable overriding [`HarnessConfig::base_url`]
pub const ENV_BASE_URL: &str = "ESCAPARATE_BASE_URL";
/// Environment variable overriding [`HarnessConfig::api_url`]
pub const ENV_API_URL: &str = "ESCAPARATE_API_URL";
/// Environment variable overriding [`HarnessConfig::navigation_timeout_ms`]
pub const ENV_NAVIGATION_TIMEOUT_MS: &str = "ESCAPARATE_NAVIGATION_TIMEOUT_MS";
/// Environment variable overriding [`HarnessConfig::action_timeout_ms`]
pub const ENV_ACTION_TIMEOUT_MS: &str = "ESCAPARATE_ACTION_TIMEOUT_MS";
/// Environment variable overriding [`HarnessConfig::screenshot_dir`]
pub const ENV_SCREENSHOT_DIR: &str = "ESCAPARATE_SCREENSHOT_DIR";
/// Environment variable overriding [`HarnessConfig::headless`]
pub const ENV_HEADLESS: &str = "ESCAPARATE_HEADLESS";

/// Configuration for a harness session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Storefront base URL (no trailing slash)
    pub base_url: String,
    /// JSON API base URL
    pub api_url: String,
    /// Timeout for navigation and load-state waits
    pub navigation_timeout_ms: u64,
    /// Timeout for element actions and reads
    pub action_timeout_ms: u64,
    /// Polling interval while waiting for element readiness
    pub poll_interval_ms: u64,
    /// Quiet interval that counts as "network idle"
    pub network_idle_ms: u64,
    /// Timeout for API requests
    pub api_timeout_ms: u64,
    /// Directory screenshots are written to
    pub screenshot_dir: PathBuf,
    /// Run the browser headless
    pub headless: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            network_idle_ms: DEFAULT_NETWORK_IDLE_MS,
            api_timeout_ms: DEFAULT_API_TIMEOUT_MS,
            screenshot_dir: PathBuf::from("screenshots"),
            headless: true,
        }
    }
}

impl HarnessConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus `ESCAPARATE_*` environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if an override cannot be parsed
    pub fn from_env() -> HarnessResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Parse a YAML document; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed or the result is invalid
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an override cannot be parsed
    pub fn with_env_overrides(self) -> HarnessResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns error if an override cannot be parsed
    pub fn with_overrides<F>(mut self, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(ms) = lookup(ENV_NAVIGATION_TIMEOUT_MS) {
            self.navigation_timeout_ms = parse_ms(ENV_NAVIGATION_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_ACTION_TIMEOUT_MS) {
            self.action_timeout_ms = parse_ms(ENV_ACTION_TIMEOUT_MS, &ms)?;
        }
        if let Some(dir) = lookup(ENV_SCREENSHOT_DIR) {
            self.screenshot_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup(ENV_HEADLESS) {
            self.headless = parse_bool(ENV_HEADLESS, &flag)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants the session relies on
    ///
    /// # Errors
    ///
    /// Returns error on an empty base URL or a zero timeout/poll interval
    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::Config {
                message: "base_url must not be empty".to_string(),
            });
        }
        for (name, value) in [
            ("navigation_timeout_ms", self.navigation_timeout_ms),
            ("action_timeout_ms", self.action_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(HarnessError::Config {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set API URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Set action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout_ms: u64) -> Self {
        self.action_timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set network idle quiet interval
    #[must_use]
    pub const fn with_network_idle(mut self, quiet_ms: u64) -> Self {
        self.network_idle_ms = quiet_ms;
        self
    }

    /// Set screenshot directory
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Action timeout as Duration
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Network idle quiet interval as Duration
    #[must_use]
    pub const fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    /// API request timeout as Duration
    #[must_use]
    pub const fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    /// Absolute storefront URL for a path (`/inventory.html`)
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Absolute API URL for a path (`/users/1`)
    #[must_use]
    pub fn api_url_for(&self, path: &str) -> String {
        join_url(&self.api_url, path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return format!("{base}/");
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn parse_ms(key: &str, value: &str) -> HarnessResult<u64> {
    value.trim().parse().map_err(|_| HarnessError::Config {
        message: format!("{key} must be a number of milliseconds, got {value:?}"),
    })
}

fn parse_bool(key: &str, value: &str) -> HarnessResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HarnessError::Config {
            message: format!("{key} must be a boolean, got {value:?}"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = HarnessConfig::default();
            assert_eq!(config.base_url, "https://www.saucedemo.com");
            assert_eq!(config.api_url, "https://jsonplaceholder.typicode.com");
            assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
            assert_eq!(config.action_timeout(), Duration::from_secs(5));
            assert_eq!(config.poll_interval(), Duration::from_millis(50));
            assert_eq!(config.network_idle(), Duration::from_millis(500));
            assert_eq!(config.screenshot_dir, PathBuf::from("screenshots"));
            assert!(config.headless);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_builder_setters() {
            let config = HarnessConfig::new()
                .with_base_url("http://localhost:3000")
                .with_action_timeout(250)
                .with_navigation_timeout(1000)
                .with_poll_interval(10)
                .with_network_idle(0)
                .with_headless(false);

            assert_eq!(config.base_url, "http://localhost:3000");
            assert_eq!(config.action_timeout_ms, 250);
            assert_eq!(config.navigation_timeout_ms, 1000);
            assert_eq!(config.poll_interval_ms, 10);
            assert_eq!(config.network_idle_ms, 0);
            assert!(!config.headless);
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_url_for_root() {
            let config = HarnessConfig::default();
            assert_eq!(config.url_for("/"), "https://www.saucedemo.com/");
            assert_eq!(config.url_for(""), "https://www.saucedemo.com/");
        }

        #[test]
        fn test_url_for_trims_trailing_slash() {
            let config = HarnessConfig::default().with_base_url("http://shop.test/");
            assert_eq!(config.url_for("/inventory.html"), "http://shop.test/inventory.html");
            assert_eq!(config.url_for("inventory.html"), "http://shop.test/inventory.html");
        }

        #[test]
        fn test_api_url_for() {
            let config = HarnessConfig::default();
            assert_eq!(
                config.api_url_for("/users/1"),
                "https://jsonplaceholder.typicode.com/users/1"
            );
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = HarnessConfig::from_yaml_str(
                "base_url: http://localhost:8080\naction_timeout_ms: 1500\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.action_timeout_ms, 1500);
            assert_eq!(config.navigation_timeout_ms, DEFAULT_NAVIGATION_TIMEOUT_MS);
        }

        #[test]
        fn test_invalid_yaml() {
            let err = HarnessConfig::from_yaml_str("action_timeout_ms: [not, a, number]").unwrap_err();
            assert!(matches!(err, HarnessError::Yaml(_)));
        }

        #[test]
        fn test_zero_timeout_rejected() {
            let err = HarnessConfig::from_yaml_str("action_timeout_ms: 0").unwrap_err();
            assert!(matches!(err, HarnessError::Config { .. }));
        }

        #[test]
        fn test_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("escaparate.yaml");
            std::fs::write(&path, "screenshot_dir: out/shots\nheadless: false\n").unwrap();

            let config = HarnessConfig::from_file(&path).unwrap();
            assert_eq!(config.screenshot_dir, PathBuf::from("out/shots"));
            assert!(!config.headless);
        }

        #[test]
        fn test_missing_file() {
            let err = HarnessConfig::from_file("/definitely/not/here.yaml").unwrap_err();
            assert!(matches!(err, HarnessError::Io(_)));
        }
    }

    mod override_tests {
        use super::*;

        #[test]
        fn test_overrides_applied() {
            let config = HarnessConfig::default()
                .with_overrides(lookup(&[
                    (ENV_BASE_URL, "http://127.0.0.1:9000"),
                    (ENV_ACTION_TIMEOUT_MS, "750"),
                    (ENV_HEADLESS, "false"),
                    (ENV_SCREENSHOT_DIR, "/tmp/shots"),
                ]))
                .unwrap();

            assert_eq!(config.base_url, "http://127.0.0.1:9000");
            assert_eq!(config.action_timeout_ms, 750);
            assert!(!config.headless);
            assert_eq!(config.screenshot_dir, PathBuf::from("/tmp/shots"));
            assert_eq!(config.api_url, DEFAULT_API_URL);
        }

        #[test]
        fn test_no_overrides_is_identity() {
            let config = HarnessConfig::default().with_overrides(|_| None).unwrap();
            assert_eq!(config, HarnessConfig::default());
        }

        #[test]
        fn test_bad_number_rejected() {
            let err = HarnessConfig::default()
                .with_overrides(lookup(&[(ENV_NAVIGATION_TIMEOUT_MS, "soon")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_NAVIGATION_TIMEOUT_MS));
        }

        #[test]
        fn test_bad_bool_rejected() {
            let err = HarnessConfig::default()
                .with_overrides(lookup(&[(ENV_HEADLESS, "maybe")]))
                .unwrap_err();
            assert!(matches!(err, HarnessError::Config { .. }));
        }
    }
}
