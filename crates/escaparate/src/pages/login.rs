//! Login screen.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::locator::Locator;
use crate::page_object::{PageContext, PageObject, UrlPattern};
use crate::result::HarnessResult;
use crate::session::Session;

/// Password shared by the demo storefront's built-in accounts
pub const DEMO_PASSWORD: &str = "secret_sauce";

/// A username/password pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The demo storefront's regular account
    #[must_use]
    pub fn standard() -> Self {
        Self::new("standard_user", DEMO_PASSWORD)
    }

    /// The demo storefront's locked account
    #[must_use]
    pub fn locked_out() -> Self {
        Self::new("locked_out_user", DEMO_PASSWORD)
    }
}

/// Page object for the login screen at `/`.
///
/// Rejected logins are not errors: they show up in the error banner
/// ([`get_error_message`](Self::get_error_message),
/// [`is_error_visible`](Self::is_error_visible)).
#[derive(Debug)]
pub struct LoginPage {
    ctx: PageContext,
    username_input: Locator,
    password_input: Locator,
    login_button: Locator,
    error_message: Locator,
}

impl LoginPage {
    /// Create the login page over a session
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            ctx: PageContext::new(session, "LoginPage", "/"),
            username_input: Locator::test_id("username"),
            password_input: Locator::test_id("password"),
            login_button: Locator::test_id("login-button"),
            error_message: Locator::test_id("error"),
        }
    }

    /// Type into the username field (the empty string is valid)
    pub async fn fill_username(&self, username: &str) -> HarnessResult<()> {
        self.ctx.ensure_loaded()?;
        self.username_input.fill(self.ctx.session(), username).await
    }

    /// Type into the password field (the empty string is valid)
    pub async fn fill_password(&self, password: &str) -> HarnessResult<()> {
        self.ctx.ensure_loaded()?;
        self.password_input.fill(self.ctx.session(), password).await
    }

    /// Submit the form. Does not wait for the resulting navigation.
    pub async fn click_login(&self) -> HarnessResult<()> {
        self.ctx.ensure_loaded()?;
        self.login_button.click(self.ctx.session()).await
    }

    /// Fill both fields and submit, in that order, stopping at the first error
    pub async fn login(&self, username: &str, password: &str) -> HarnessResult<()> {
        info!(page = self.ctx.name(), username, "login");
        self.fill_username(username).await?;
        self.fill_password(password).await?;
        self.click_login().await
    }

    /// [`login`](Self::login) with a credential pair
    pub async fn login_with(&self, credentials: &Credentials) -> HarnessResult<()> {
        self.login(&credentials.username, &credentials.password).await
    }

    /// Error banner text, `""` when there is no banner
    pub async fn get_error_message(&self) -> HarnessResult<String> {
        self.ctx.ensure_loaded()?;
        let text = self.error_message.text_content(self.ctx.session()).await?;
        Ok(text.unwrap_or_default())
    }

    /// Whether the error banner is shown
    pub async fn is_error_visible(&self) -> HarnessResult<bool> {
        self.ctx.ensure_loaded()?;
        self.error_message.is_visible(self.ctx.session()).await
    }

    /// Whether the submit button accepts clicks
    pub async fn is_login_enabled(&self) -> HarnessResult<bool> {
        self.ctx.ensure_loaded()?;
        self.login_button.is_enabled(self.ctx.session()).await
    }
}

impl PageObject for LoginPage {
    fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::root(&self.ctx.session().config().base_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::HarnessConfig;
    use crate::driver::{MockDriver, MockElement};
    use crate::page_object::PageState;
    use crate::result::HarnessError;

    const USERNAME: &str = r#"[data-test="username"]"#;
    const PASSWORD: &str = r#"[data-test="password"]"#;
    const SUBMIT: &str = r#"[data-test="login-button"]"#;
    const ERROR: &str = r#"[data-test="error"]"#;

    fn login_form() -> MockDriver {
        MockDriver::new()
            .with_element(USERNAME, MockElement::new())
            .with_element(PASSWORD, MockElement::new())
            .with_element(SUBMIT, MockElement::new())
    }

    async fn loaded_page(driver: Arc<MockDriver>) -> LoginPage {
        let config = HarnessConfig::default().with_action_timeout(100);
        let page = LoginPage::new(Session::new(driver, config));
        page.navigate().await.unwrap();
        page
    }

    mod credentials_tests {
        use super::*;

        #[test]
        fn test_well_known_accounts() {
            assert_eq!(Credentials::standard().username, "standard_user");
            assert_eq!(Credentials::locked_out().username, "locked_out_user");
            assert_eq!(Credentials::standard().password, "secret_sauce");
        }
    }

    mod login_tests {
        use super::*;

        #[tokio::test]
        async fn test_not_ready_before_navigate() {
            let page = LoginPage::new(Session::new(
                Arc::new(login_form()),
                HarnessConfig::default(),
            ));
            let err = page.fill_username("standard_user").await.unwrap_err();
            assert!(matches!(
                err,
                HarnessError::NotReady { page: "LoginPage", state: PageState::Uninitialized }
            ));
        }

        #[tokio::test]
        async fn test_login_fills_then_clicks() {
            let driver = Arc::new(login_form());
            let page = loaded_page(Arc::clone(&driver)).await;

            page.login("standard_user", "secret_sauce").await.unwrap();

            let actions: Vec<String> = driver
                .history()
                .into_iter()
                .filter(|c| !c.starts_with("goto") && !c.starts_with("wait"))
                .collect();
            assert_eq!(
                actions,
                vec![
                    format!("fill:{USERNAME}:standard_user"),
                    format!("fill:{PASSWORD}:secret_sauce"),
                    format!("click:{SUBMIT}"),
                ]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_login_stops_at_first_error() {
            let driver = Arc::new(
                MockDriver::new()
                    .with_element(PASSWORD, MockElement::new())
                    .with_element(SUBMIT, MockElement::new()),
            );
            let page = loaded_page(Arc::clone(&driver)).await;

            let err = page.login("u", "p").await.unwrap_err();

            assert!(matches!(err, HarnessError::ElementNotFound { .. }));
            assert!(!driver.was_called("fill"));
            assert!(!driver.was_called("click"));
        }

        #[tokio::test]
        async fn test_empty_value_is_filled() {
            let driver = Arc::new(login_form());
            let page = loaded_page(Arc::clone(&driver)).await;
            page.fill_username("").await.unwrap();
            assert_eq!(driver.value_of(USERNAME).as_deref(), Some(""));
        }
    }

    mod banner_tests {
        use super::*;

        #[tokio::test]
        async fn test_no_banner() {
            let page = loaded_page(Arc::new(login_form())).await;
            assert_eq!(page.get_error_message().await.unwrap(), "");
            assert!(!page.is_error_visible().await.unwrap());
        }

        #[tokio::test]
        async fn test_banner_text() {
            let driver = login_form().with_element(
                ERROR,
                MockElement::new().with_text("Epic sadface: Username is required"),
            );
            let page = loaded_page(Arc::new(driver)).await;
            assert!(page.is_error_visible().await.unwrap());
            assert!(page
                .get_error_message()
                .await
                .unwrap()
                .contains("Username is required"));
        }

        #[tokio::test]
        async fn test_submit_enabled() {
            let page = loaded_page(Arc::new(login_form())).await;
            assert!(page.is_login_enabled().await.unwrap());
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_url_pattern_is_site_root() {
            let page = LoginPage::new(Session::new(
                Arc::new(MockDriver::new()),
                HarnessConfig::default(),
            ));
            let pattern = page.url_pattern();
            assert!(pattern.matches("https://www.saucedemo.com/"));
            assert!(!pattern.matches("https://www.saucedemo.com/inventory.html"));
        }
    }
}
