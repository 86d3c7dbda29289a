//! In-memory storefront simulator.
//!
//! [`StorefrontDriver`] implements [`Driver`] over a small model of the demo
//! store: the login form with its validation rules and exact error texts,
//! the six-product inventory, the side menu, the cart badge and logout.
//! Journeys run against it without a browser.
//!
//! Selectors understood: `[data-test="..."]`, `#id` and `.class`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::join_url;
use crate::driver::{Driver, ElementHandle, ElementSet, PNG_SIGNATURE};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::NetworkActivity;

/// Document title of every storefront screen
pub const STOREFRONT_TITLE: &str = "Swag Labs";

/// Products listed on the inventory screen, in display order
pub const PRODUCTS: [&str; 6] = [
    "Sauce Labs Backpack",
    "Sauce Labs Bike Light",
    "Sauce Labs Bolt T-Shirt",
    "Sauce Labs Fleece Jacket",
    "Sauce Labs Onesie",
    "Test.allTheThings() T-Shirt (Red)",
];

/// Accounts that can log in with the demo password
pub const ACCEPTED_USERS: [&str; 5] = [
    "standard_user",
    "problem_user",
    "performance_glitch_user",
    "error_user",
    "visual_user",
];

const LOCKED_OUT_USER: &str = "locked_out_user";
const PASSWORD: &str = "secret_sauce";
const INVENTORY_PATH: &str = "/inventory.html";

const USERNAME_REQUIRED: &str = "Epic sadface: Username is required";
const PASSWORD_REQUIRED: &str = "Epic sadface: Password is required";
const LOCKED_OUT: &str = "Epic sadface: Sorry, this user has been locked out.";
const NO_MATCH: &str = "Epic sadface: Username and password do not match any user in this service";

// =============================================================================
// MODEL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Blank,
    Login {
        username: String,
        password: String,
        error: Option<String>,
    },
    Inventory {
        menu_open: bool,
    },
}

impl Screen {
    fn login(error: Option<String>) -> Self {
        Self::Login {
            username: String::new(),
            password: String::new(),
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Username,
    Password,
    LoginButton,
    ErrorBanner,
    ErrorClose,
    Title,
    MenuButton,
    MenuClose,
    LogoutLink,
    ResetLink,
    CartLink,
    CartBadge,
    Item,
    ItemName,
    AddToCart(usize),
    RemoveFromCart(usize),
}

#[derive(Debug)]
struct Node {
    target: Target,
    test_id: Option<String>,
    id: Option<&'static str>,
    classes: &'static [&'static str],
    text: Option<String>,
    visible: bool,
}

impl Node {
    fn new(target: Target, test_id: &str) -> Self {
        Self {
            target,
            test_id: Some(test_id.to_string()),
            id: None,
            classes: &[],
            text: None,
            visible: true,
        }
    }

    fn id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    fn classes(mut self, classes: &'static [&'static str]) -> Self {
        self.classes = classes;
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    fn matches(&self, query: &Query<'_>) -> bool {
        match query {
            Query::TestId(wanted) => self.test_id.as_deref() == Some(*wanted),
            Query::Id(wanted) => self.id == Some(*wanted),
            Query::Class(wanted) => self.classes.contains(wanted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query<'a> {
    TestId(&'a str),
    Id(&'a str),
    Class(&'a str),
}

impl<'a> Query<'a> {
    fn parse(selector: &'a str) -> HarnessResult<Self> {
        let selector = selector.trim();
        if let Some(inner) = selector
            .strip_prefix("[data-test=")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let value = inner.trim_matches(|c| c == '"' || c == '\'');
            return Ok(Self::TestId(value));
        }
        let simple = |name: &str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if let Some(id) = selector.strip_prefix('#').filter(|id| simple(id)) {
            return Ok(Self::Id(id));
        }
        if let Some(class) = selector.strip_prefix('.').filter(|class| simple(class)) {
            return Ok(Self::Class(class));
        }
        Err(HarnessError::driver(format!(
            "unsupported selector {selector:?}"
        )))
    }
}

fn slug(product: &str) -> String {
    product.to_lowercase().replace(' ', "-")
}

#[derive(Debug)]
struct StoreState {
    base_url: String,
    current_url: String,
    screen: Screen,
    logged_in: bool,
    cart: Vec<usize>,
    navigation_failure: Option<String>,
    stalled: bool,
    call_history: Vec<String>,
}

impl StoreState {
    fn dom(&self) -> Vec<Node> {
        match &self.screen {
            Screen::Blank => Vec::new(),
            Screen::Login { error, .. } => {
                let mut nodes = vec![
                    Node::new(Target::Username, "username")
                        .id("user-name")
                        .classes(&["input_error", "form_input"]),
                    Node::new(Target::Password, "password")
                        .id("password")
                        .classes(&["input_error", "form_input"]),
                    Node::new(Target::LoginButton, "login-button")
                        .id("login-button")
                        .classes(&["submit-button", "btn_action"]),
                ];
                if let Some(message) = error {
                    nodes.push(Node::new(Target::ErrorBanner, "error").text(message.as_str()));
                    nodes.push(Node::new(Target::ErrorClose, "error-button").classes(&["error-button"]));
                }
                nodes
            }
            Screen::Inventory { menu_open } => {
                let mut nodes = vec![
                    Node::new(Target::Title, "title").classes(&["title"]).text("Products"),
                    Node::new(Target::MenuButton, "open-menu").id("react-burger-menu-btn"),
                    Node::new(Target::MenuClose, "close-menu")
                        .id("react-burger-cross-btn")
                        .visible(*menu_open),
                    Node::new(Target::LogoutLink, "logout-sidebar-link")
                        .id("logout_sidebar_link")
                        .classes(&["bm-item", "menu-item"])
                        .text("Logout")
                        .visible(*menu_open),
                    Node::new(Target::ResetLink, "reset-sidebar-link")
                        .id("reset_sidebar_link")
                        .classes(&["bm-item", "menu-item"])
                        .text("Reset App State")
                        .visible(*menu_open),
                    Node::new(Target::CartLink, "shopping-cart-link").classes(&["shopping_cart_link"]),
                ];
                if !self.cart.is_empty() {
                    nodes.push(
                        Node::new(Target::CartBadge, "shopping-cart-badge")
                            .classes(&["shopping_cart_badge"])
                            .text(self.cart.len().to_string()),
                    );
                }
                for (index, product) in PRODUCTS.iter().enumerate() {
                    nodes.push(Node::new(Target::Item, "inventory-item").classes(&["inventory_item"]));
                    nodes.push(
                        Node::new(Target::ItemName, "inventory-item-name")
                            .classes(&["inventory_item_name"])
                            .text(*product),
                    );
                    let button = if self.cart.contains(&index) {
                        Node::new(Target::RemoveFromCart(index), &format!("remove-{}", slug(product)))
                            .classes(&["btn", "btn_secondary", "btn_inventory"])
                            .text("Remove")
                    } else {
                        Node::new(Target::AddToCart(index), &format!("add-to-cart-{}", slug(product)))
                            .classes(&["btn", "btn_primary", "btn_inventory"])
                            .text("Add to cart")
                    };
                    nodes.push(button);
                }
                nodes
            }
        }
    }

    fn matching(&self, selector: &str) -> HarnessResult<Vec<Node>> {
        let query = Query::parse(selector)?;
        Ok(self
            .dom()
            .into_iter()
            .filter(|node| node.matches(&query))
            .collect())
    }

    fn node(&self, handle: &ElementHandle) -> HarnessResult<Node> {
        self.matching(&handle.selector)?
            .into_iter()
            .nth(handle.index)
            .ok_or_else(|| HarnessError::ElementNotFound {
                selector: handle.selector.clone(),
            })
    }

    fn show_login(&mut self, error: Option<String>) {
        self.screen = Screen::login(error);
        self.current_url = join_url(&self.base_url, "/");
    }

    fn show_inventory(&mut self) {
        self.screen = Screen::Inventory { menu_open: false };
        self.current_url = join_url(&self.base_url, INVENTORY_PATH);
    }

    fn submit_login(&mut self) {
        let Screen::Login {
            username, password, ..
        } = &self.screen
        else {
            return;
        };
        let rejection = if username.is_empty() {
            Some(USERNAME_REQUIRED)
        } else if password.is_empty() {
            Some(PASSWORD_REQUIRED)
        } else if password != PASSWORD {
            Some(NO_MATCH)
        } else if username == LOCKED_OUT_USER {
            Some(LOCKED_OUT)
        } else if ACCEPTED_USERS.contains(&username.as_str()) {
            None
        } else {
            Some(NO_MATCH)
        };

        match rejection {
            None => {
                info!(username = %username, "storefront login accepted");
                self.logged_in = true;
                self.show_inventory();
            }
            Some(message) => {
                debug!(username = %username, message, "storefront login rejected");
                if let Screen::Login { error, .. } = &mut self.screen {
                    *error = Some(message.to_string());
                }
            }
        }
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Driver backed by an in-memory model of the demo storefront.
///
/// Every action is recorded (`goto:`, `fill:`, `click:`, `screenshot:`) so
/// journeys can be compared call for call. Page loads and logins register
/// network activity, so `wait_until_network_idle` behaves like a browser's.
#[derive(Debug)]
pub struct StorefrontDriver {
    state: Mutex<StoreState>,
    network: NetworkActivity,
}

impl StorefrontDriver {
    /// A fresh browser with nothing loaded
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            state: Mutex::new(StoreState {
                current_url: "about:blank".to_string(),
                base_url,
                screen: Screen::Blank,
                logged_in: false,
                cart: Vec::new(),
                navigation_failure: None,
                stalled: false,
                call_history: Vec::new(),
            }),
            network: NetworkActivity::new(),
        }
    }

    /// A browser already logged in and showing the inventory screen
    #[must_use]
    pub fn logged_in(base_url: impl Into<String>) -> Self {
        let driver = Self::new(base_url);
        {
            let mut state = driver.lock();
            state.logged_in = true;
            state.show_inventory();
        }
        driver
    }

    /// Put the first `count` products in the cart
    pub fn set_cart_count(&self, count: usize) {
        self.lock().cart = (0..count.min(PRODUCTS.len())).collect();
    }

    /// Number of products in the cart
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.lock().cart.len()
    }

    /// Whether a user is logged in
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.lock().logged_in
    }

    /// Make the next `goto_url` fail with a navigation error
    pub fn fail_next_navigation(&self, message: impl Into<String>) {
        self.lock().navigation_failure = Some(message.into());
    }

    /// While stalled, every driver call hangs until cancelled
    pub fn set_stalled(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    /// Network tracker for page activity
    #[must_use]
    pub fn network(&self) -> &NetworkActivity {
        &self.network
    }

    /// Recorded actions, in call order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().call_history.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn gate(&self) {
        let stalled = self.lock().stalled;
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn record(&self, call: String) {
        self.lock().call_history.push(call);
    }
}

#[async_trait]
impl Driver for StorefrontDriver {
    async fn goto_url(&self, url: &str) -> HarnessResult<()> {
        self.record(format!("goto:{url}"));
        self.gate().await;

        let mut state = self.lock();
        if let Some(message) = state.navigation_failure.take() {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                message,
            });
        }

        let path = url
            .strip_prefix(state.base_url.as_str())
            .map(|p| p.split(['?', '#']).next().unwrap_or_default());
        match path {
            Some("" | "/") => state.show_login(None),
            Some(INVENTORY_PATH) if state.logged_in => state.show_inventory(),
            Some(INVENTORY_PATH) => state.show_login(Some(format!(
                "Epic sadface: You can only access '{INVENTORY_PATH}' when you are logged in."
            ))),
            _ => {
                return Err(HarnessError::Navigation {
                    url: url.to_string(),
                    message: "404 Not Found".to_string(),
                })
            }
        }
        drop(state);
        self.network.record();
        Ok(())
    }

    async fn wait_until_network_idle(&self, quiet: Duration, timeout: Duration) -> HarnessResult<()> {
        self.gate().await;
        self.network.wait_for_idle(quiet, timeout).await
    }

    async fn current_url(&self) -> HarnessResult<String> {
        self.gate().await;
        Ok(self.lock().current_url.clone())
    }

    async fn title(&self) -> HarnessResult<String> {
        self.gate().await;
        let title = match self.lock().screen {
            Screen::Blank => "",
            _ => STOREFRONT_TITLE,
        };
        Ok(title.to_string())
    }

    async fn screenshot(&self, path: &Path) -> HarnessResult<()> {
        self.record(format!("screenshot:{}", path.display()));
        self.gate().await;
        tokio::fs::write(path, PNG_SIGNATURE).await?;
        Ok(())
    }

    async fn resolve(&self, selector: &str) -> HarnessResult<ElementSet> {
        self.gate().await;
        let count = self.lock().matching(selector)?.len();
        Ok(ElementSet::from_count(selector, count))
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.record(format!("fill:{}:{text}", handle.selector));
        self.gate().await;
        let mut state = self.lock();
        let target = state.node(handle)?.target;
        match (&mut state.screen, target) {
            (Screen::Login { username, .. }, Target::Username) => *username = text.to_string(),
            (Screen::Login { password, .. }, Target::Password) => *password = text.to_string(),
            _ => {
                return Err(HarnessError::driver(format!(
                    "element {} is not an input",
                    handle.selector
                )))
            }
        }
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> HarnessResult<()> {
        self.record(format!("click:{}", handle.selector));
        self.gate().await;
        let mut state = self.lock();
        let node = state.node(handle)?;
        if !node.visible {
            return Err(HarnessError::driver(format!(
                "element {} is not visible",
                handle.selector
            )));
        }

        let mut navigated = false;
        match node.target {
            Target::LoginButton => {
                state.submit_login();
                navigated = state.logged_in;
            }
            Target::ErrorClose => {
                if let Screen::Login { error, .. } = &mut state.screen {
                    *error = None;
                }
            }
            Target::MenuButton | Target::MenuClose => {
                if let Screen::Inventory { menu_open } = &mut state.screen {
                    *menu_open = node.target == Target::MenuButton;
                }
            }
            Target::LogoutLink => {
                info!("storefront logout");
                state.logged_in = false;
                state.show_login(None);
                navigated = true;
            }
            Target::ResetLink => state.cart.clear(),
            Target::AddToCart(index) => state.cart.push(index),
            Target::RemoveFromCart(index) => state.cart.retain(|&i| i != index),
            _ => {}
        }
        drop(state);
        if navigated {
            self.network.record();
        }
        Ok(())
    }

    async fn text_content(&self, handle: &ElementHandle) -> HarnessResult<Option<String>> {
        self.gate().await;
        let state = self.lock();
        Ok(state.node(handle)?.text)
    }

    async fn is_visible(&self, handle: &ElementHandle) -> HarnessResult<bool> {
        self.gate().await;
        let state = self.lock();
        Ok(state.node(handle)?.visible)
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> HarnessResult<bool> {
        self.gate().await;
        let state = self.lock();
        state.node(handle).map(|_| true)
    }

    async fn count(&self, selector: &str) -> HarnessResult<usize> {
        self.gate().await;
        Ok(self.lock().matching(selector)?.len())
    }
}
