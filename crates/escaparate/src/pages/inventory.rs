//! Inventory (product listing) screen, the landing page after login.

use tracing::{debug, info};

use crate::locator::Locator;
use crate::page_object::{PageContext, PageObject, UrlPattern};
use crate::result::HarnessResult;
use crate::session::Session;

/// Page object for the inventory screen at `/inventory.html`
#[derive(Debug)]
pub struct InventoryPage {
    ctx: PageContext,
    page_title: Locator,
    menu_button: Locator,
    logout_link: Locator,
    cart_badge: Locator,
    inventory_items: Locator,
}

impl InventoryPage {
    /// Create the inventory page over a session
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            ctx: PageContext::new(session, "InventoryPage", "/inventory.html"),
            page_title: Locator::class("title"),
            menu_button: Locator::id("react-burger-menu-btn"),
            logout_link: Locator::test_id("logout-sidebar-link"),
            cart_badge: Locator::class("shopping_cart_badge"),
            inventory_items: Locator::class("inventory_item"),
        }
    }

    /// Heading text of the screen, `""` if absent
    pub async fn get_page_title(&self) -> HarnessResult<String> {
        self.ctx.ensure_loaded()?;
        let text = self.page_title.text_content(self.ctx.session()).await?;
        Ok(text.unwrap_or_default())
    }

    /// Open the side menu. No click is issued when it is already open.
    pub async fn open_menu(&self) -> HarnessResult<()> {
        self.ctx.ensure_loaded()?;
        let session = self.ctx.session();
        if self.logout_link.is_visible(session).await? {
            debug!(page = self.ctx.name(), "menu already open");
            return Ok(());
        }
        self.menu_button.click(session).await
    }

    /// Open the menu and log out, returning the session to the login screen
    pub async fn logout(&self) -> HarnessResult<()> {
        info!(page = self.ctx.name(), "logout");
        self.open_menu().await?;
        self.logout_link.click(self.ctx.session()).await?;
        self.ctx.mark_unloaded();
        Ok(())
    }

    /// Whether the screen heading is shown
    pub async fn is_on_inventory_page(&self) -> HarnessResult<bool> {
        self.ctx.ensure_loaded()?;
        self.page_title.is_visible(self.ctx.session()).await
    }

    /// Number of products listed
    pub async fn get_product_count(&self) -> HarnessResult<usize> {
        self.ctx.ensure_loaded()?;
        self.inventory_items.count(self.ctx.session()).await
    }

    /// Cart badge text, `"0"` when the badge is absent or hidden
    pub async fn get_cart_item_count(&self) -> HarnessResult<String> {
        self.ctx.ensure_loaded()?;
        let session = self.ctx.session();
        if !self.cart_badge.is_visible(session).await? {
            return Ok("0".to_string());
        }
        let text = self.cart_badge.text_content(session).await?;
        Ok(text.unwrap_or_else(|| "0".to_string()))
    }

    /// Whether the browser's current URL is the inventory screen
    pub async fn matches_current_url(&self) -> HarnessResult<bool> {
        let url = self.ctx.current_url().await?;
        Ok(self.url_pattern().matches(&url))
    }
}

impl PageObject for InventoryPage {
    fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::glob("*/inventory.html")
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

    const MENU: &str = "#react-burger-menu-btn";
    const LOGOUT: &str = r#"[data-test="logout-sidebar-link"]"#;
    const BADGE: &str = ".shopping_cart_badge";

    fn inventory_screen() -> MockDriver {
        let mut driver = MockDriver::new()
            .with_element(".title", MockElement::new().with_text("Products"))
            .with_element(MENU, MockElement::new());
        for _ in 0..6 {
            driver = driver.with_element(".inventory_item", MockElement::new());
        }
        driver
    }

    async fn loaded_page(driver: Arc<MockDriver>) -> InventoryPage {
        let config = HarnessConfig::default().with_action_timeout(100);
        let page = InventoryPage::new(Session::new(driver, config));
        page.wait_for_page_load().await.unwrap();
        page
    }

    mod read_tests {
        use super::*;

        #[tokio::test]
        async fn test_title_and_products() {
            let page = loaded_page(Arc::new(inventory_screen())).await;
            assert_eq!(page.get_page_title().await.unwrap(), "Products");
            assert!(page.is_on_inventory_page().await.unwrap());
            assert_eq!(page.get_product_count().await.unwrap(), 6);
        }

        #[tokio::test]
        async fn test_missing_title_reads_empty() {
            let page = loaded_page(Arc::new(MockDriver::new())).await;
            assert_eq!(page.get_page_title().await.unwrap(), "");
            assert!(!page.is_on_inventory_page().await.unwrap());
        }

        #[tokio::test]
        async fn test_not_ready_before_load() {
            let page = InventoryPage::new(Session::new(
                Arc::new(inventory_screen()),
                HarnessConfig::default(),
            ));
            let err = page.get_product_count().await.unwrap_err();
            assert!(matches!(err, HarnessError::NotReady { page: "InventoryPage", .. }));
        }
    }

    mod cart_tests {
        use super::*;

        #[tokio::test]
        async fn test_no_badge_reads_zero() {
            let page = loaded_page(Arc::new(inventory_screen())).await;
            assert_eq!(page.get_cart_item_count().await.unwrap(), "0");
        }

        #[tokio::test]
        async fn test_hidden_badge_reads_zero() {
            let driver = inventory_screen().with_element(BADGE, MockElement::new().with_text("2").hidden());
            let page = loaded_page(Arc::new(driver)).await;
            assert_eq!(page.get_cart_item_count().await.unwrap(), "0");
        }

        #[tokio::test]
        async fn test_badge_text() {
            let driver = inventory_screen().with_element(BADGE, MockElement::new().with_text("3"));
            let page = loaded_page(Arc::new(driver)).await;
            assert_eq!(page.get_cart_item_count().await.unwrap(), "3");
        }
    }

    mod menu_tests {
        use super::*;

        #[tokio::test]
        async fn test_open_menu_clicks_trigger() {
            let driver = Arc::new(inventory_screen().with_element(LOGOUT, MockElement::new().hidden()));
            let page = loaded_page(Arc::clone(&driver)).await;
            page.open_menu().await.unwrap();
            assert!(driver.was_called(&format!("click:{MENU}")));
        }

        #[tokio::test]
        async fn test_open_menu_skips_click_when_open() {
            let driver = Arc::new(inventory_screen().with_element(LOGOUT, MockElement::new()));
            let page = loaded_page(Arc::clone(&driver)).await;
            page.open_menu().await.unwrap();
            assert!(!driver.was_called("click"));
        }

        #[tokio::test]
        async fn test_logout_order_and_state() {
            let driver = Arc::new(inventory_screen().with_element(LOGOUT, MockElement::new()));
            let page = loaded_page(Arc::clone(&driver)).await;

            page.logout().await.unwrap();

            assert!(driver.was_called(&format!("click:{LOGOUT}")));
            assert_eq!(page.state(), PageState::Uninitialized);
        }
    }

    #[tokio::test]
    async fn test_matches_current_url() {
        let driver = Arc::new(inventory_screen());
        let page = InventoryPage::new(Session::new(
            Arc::clone(&driver) as Arc<dyn crate::driver::Driver>,
            HarnessConfig::default(),
        ));
        page.navigate().await.unwrap();
        assert!(page.matches_current_url().await.unwrap());
    }
}
