//! Real-browser driver over the Chrome DevTools Protocol.
//!
//! Elements are resolved in the page with `document.querySelectorAll`, and
//! handles are re-resolved by index on every call, so a handle whose
//! element disappeared reports [`HarnessError::ElementNotFound`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::driver::{Driver, ElementHandle, ElementSet};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{poll_until, WaitOptions};

const IDLE_POLL_MS: u64 = 50;

/// Result of a script run against one element
#[derive(Debug, Deserialize)]
struct ElementProbe<T> {
    found: bool,
    value: Option<T>,
}

/// Driver backed by a Chromium instance
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns a driver error if the browser cannot be launched
    pub async fn launch(config: &HarnessConfig) -> HarnessResult<Self> {
        let mut builder = CdpConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder.build().map_err(HarnessError::driver)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(HarnessError::driver)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(HarnessError::driver)?;
        info!(headless = config.headless, "chromium launched");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns a driver error if the browser does not shut down cleanly
    pub async fn close(&self) -> HarnessResult<()> {
        let mut browser = self.browser.lock().await;
        let _ = browser.close().await.map_err(HarnessError::driver)?;
        self.handler.abort();
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> HarnessResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(HarnessError::driver)?;
        result.into_value().map_err(HarnessError::driver)
    }

    /// Run `body` with `el` bound to the handle's element
    async fn on_element<T: DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> HarnessResult<Option<T>> {
        let script = format!(
            "(() => {{ const el = document.querySelectorAll({selector})[{index}]; \
             if (!el) return {{ found: false, value: null }}; \
             return {{ found: true, value: (() => {{ {body} }})() }}; }})()",
            selector = js_string(&handle.selector),
            index = handle.index,
        );
        let probe: ElementProbe<T> = self.eval(script).await?;
        if !probe.found {
            return Err(HarnessError::ElementNotFound {
                selector: handle.selector.clone(),
            });
        }
        Ok(probe.value)
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn goto_url(&self, url: &str) -> HarnessResult<()> {
        debug!(url, "goto");
        let _ = self
            .page
            .goto(url)
            .await
            .map_err(|e| HarnessError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// The page is idle once the document is complete and no new resource
    /// entries have appeared for `quiet`.
    async fn wait_until_network_idle(&self, quiet: Duration, timeout: Duration) -> HarnessResult<()> {
        let options = WaitOptions::new()
            .with_timeout(timeout.as_millis() as u64)
            .with_poll_interval(IDLE_POLL_MS);
        let last = &std::sync::Mutex::new((usize::MAX, Instant::now()));
        let result = poll_until(&options, "network idle", move || async move {
            let (ready, resources): (String, usize) = self
                .eval(
                    "[document.readyState, performance.getEntriesByType('resource').length]"
                        .to_string(),
                )
                .await?;
            let mut seen = last.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if seen.0 != resources || ready != "complete" {
                *seen = (resources, Instant::now());
                return Ok(None);
            }
            Ok((seen.1.elapsed() >= quiet).then_some(()))
        })
        .await;
        if let Err(err) = &result {
            warn!(error = %err, "network did not go idle");
        }
        result.map(|_| ())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        self.eval("window.location.href".to_string()).await
    }

    async fn title(&self) -> HarnessResult<String> {
        self.eval("document.title".to_string()).await
    }

    async fn screenshot(&self, path: &Path) -> HarnessResult<()> {
        use base64::Engine;

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self.page.execute(params).await.map_err(HarnessError::driver)?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(HarnessError::driver)?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn resolve(&self, selector: &str) -> HarnessResult<ElementSet> {
        let count = self.count(selector).await?;
        Ok(ElementSet::from_count(selector, count))
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> HarnessResult<()> {
        debug!(selector = %handle.selector, "fill");
        // Native setter so framework-managed inputs see the change.
        let body = format!(
            "const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {text}); \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            text = js_string(text),
        );
        self.on_element::<bool>(handle, &body).await.map(|_| ())
    }

    async fn click(&self, handle: &ElementHandle) -> HarnessResult<()> {
        debug!(selector = %handle.selector, "click");
        self.on_element::<bool>(handle, "el.click(); return true;")
            .await
            .map(|_| ())
    }

    async fn text_content(&self, handle: &ElementHandle) -> HarnessResult<Option<String>> {
        self.on_element(handle, "return el.textContent;").await
    }

    async fn is_visible(&self, handle: &ElementHandle) -> HarnessResult<bool> {
        let visible = self
            .on_element(
                handle,
                "const style = getComputedStyle(el); \
                 return style.visibility !== 'hidden' && style.display !== 'none' \
                 && el.getClientRects().length > 0;",
            )
            .await?;
        Ok(visible.unwrap_or(false))
    }

    async fn is_enabled(&self, handle: &ElementHandle) -> HarnessResult<bool> {
        let enabled = self.on_element(handle, "return !el.disabled;").await?;
        Ok(enabled.unwrap_or(true))
    }

    async fn count(&self, selector: &str) -> HarnessResult<usize> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        ))
        .await
    }
}
