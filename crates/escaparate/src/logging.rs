//! Structured logging setup.
//!
//! Page objects, locators and sessions emit `tracing` events; this module
//! installs a `tracing-subscriber` formatter for them. `RUST_LOG` wins over
//! the default filter.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "escaparate=info";

/// Output format for harness logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install the default subscriber.
///
/// Returns `false` if a global subscriber was already installed, which makes
/// it safe to call from every test.
pub fn init() -> bool {
    init_with(LogFormat::Pretty, DEFAULT_FILTER)
}

/// Install a subscriber with an explicit format and fallback filter.
pub fn init_with(format: LogFormat, default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer();

    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
