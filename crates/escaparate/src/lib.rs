//! Escaparate: Page-Object Harness for Storefront Journeys
//!
//! Escaparate (Spanish: "shop window") lets tests express storefront user
//! journeys (log in, browse the inventory, log out) and API contract checks
//! without touching raw selectors or HTTP plumbing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  ESCAPARATE Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ Test body  │    │ Page       │    │ Driver             │    │
//! │   │ (journey)  │───►│ Objects    │───►│ storefront sim /   │    │
//! │   │            │    │ + Locators │    │ chromium / mock    │    │
//! │   └────────────┘    └────────────┘    └────────────────────┘    │
//! │         │                 │                                      │
//! │         │           ┌────────────┐    ┌────────────┐            │
//! │         └──────────►│ Session    │    │ ApiClient  │            │
//! │                     │ (timeouts, │    │ (reqwest)  │            │
//! │                     │  close)    │    └────────────┘            │
//! │                     └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use escaparate::prelude::*;
//!
//! # async fn journey() -> HarnessResult<()> {
//! let config = HarnessConfig::from_env()?;
//! let driver = Arc::new(StorefrontDriver::new(config.base_url.clone()));
//!
//! Session::scoped(driver, config, |session| async move {
//!     let login = LoginPage::new(session.clone());
//!     let inventory = InventoryPage::new(session);
//!
//!     login.navigate().await?;
//!     login.login_with(&Credentials::standard()).await?;
//!     inventory.wait_for_page_load().await?;
//!     assert_eq!(inventory.get_product_count().await?, 6);
//!     Ok(())
//! })
//! .await
//! # }
//! ```

#![warn(missing_docs)]

mod builder;
mod clock;
mod config;
mod driver;
mod locator;
pub mod logging;
mod page_object;
mod pages;
mod result;
mod session;
mod storefront;
mod wait;

#[cfg(feature = "api")]
mod api;

#[cfg(feature = "browser")]
mod chromium;

#[cfg(feature = "api")]
pub use api::{ApiClient, ApiResponse};
pub use builder::{UserBuilder, UserRecord, DEFAULT_NAME, DEFAULT_PASSWORD, DEFAULT_ROLE};
#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    HarnessConfig, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_API_TIMEOUT_MS, DEFAULT_API_URL,
    DEFAULT_BASE_URL, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_NETWORK_IDLE_MS,
    DEFAULT_POLL_INTERVAL_MS, ENV_ACTION_TIMEOUT_MS, ENV_API_URL, ENV_BASE_URL, ENV_HEADLESS,
    ENV_NAVIGATION_TIMEOUT_MS, ENV_SCREENSHOT_DIR,
};
pub use driver::{
    Driver, ElementHandle, ElementSet, MockDriver, MockElement, PNG_SIGNATURE,
};
pub use locator::{Locator, Selector};
pub use page_object::{PageContext, PageObject, PageState, UrlPattern};
pub use pages::{Credentials, InventoryPage, LoginPage};
pub use result::{HarnessError, HarnessResult};
pub use session::Session;
pub use storefront::{StorefrontDriver, ACCEPTED_USERS, PRODUCTS, STOREFRONT_TITLE};
pub use wait::{poll_until, NetworkActivity, WaitOptions, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "api")]
    pub use super::api::*;
    pub use super::builder::*;
    #[cfg(feature = "browser")]
    pub use super::chromium::*;
    pub use super::clock::*;
    pub use super::config::HarnessConfig;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::page_object::*;
    pub use super::pages::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::storefront::*;
    pub use super::wait::*;
}
