//! Chromium driver over the DevTools protocol (chromiumoxide).

use super::session::launch_args;
use super::{BrowserOptions, Driver, find_chrome};
use crate::error::{DriverError, HarvestError};
use crate::locator::{Condition, Locator};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const CLICKABLE_FN: &str = r#"function() {
  var s = window.getComputedStyle(this);
  var r = this.getBoundingClientRect();
  return !this.disabled && s.visibility !== 'hidden' && s.display !== 'none'
    && r.width > 0 && r.height > 0;
}"#;

const CLEAR_FN: &str = r#"function() {
  this.value = '';
  this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

const TEXT_FN: &str = r#"function() { return (this.textContent || '').trim(); }"#;

/// A live Chromium instance with one page.
pub struct CdpDriver {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

impl CdpDriver {
    /// Launch Chromium with fingerprint suppression and open a blank page.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, HarvestError> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .viewport(None)
            .request_timeout(options.request_timeout())
            .disable_default_args()
            .args(launch_args());
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = options.executable.clone().or_else(find_chrome) {
            debug!(executable = %path.display(), "Using browser executable");
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| HarvestError::SessionStart(format!("invalid browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::SessionStart(format!("failed to launch browser: {e}")))?;

        // The protocol handler must be polled for the connection to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(HarvestError::SessionStart(format!("failed to open page: {e}")));
            }
        };

        info!(headless = options.headless, "Browser started");
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
        })
    }

    async fn resolve(&self, locator: &Locator) -> Result<Element, DriverError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            other => {
                let xpath = other
                    .to_xpath()
                    .ok_or_else(|| DriverError::NotFound(other.to_string()))?;
                self.page.find_xpath(xpath).await
            }
        };
        found.map_err(|_| DriverError::NotFound(locator.to_string()))
    }

    async fn call_bool(&self, element: &Element, function: &str) -> Result<bool, DriverError> {
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(protocol)?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

fn protocol(e: impl std::fmt::Display) -> DriverError {
    DriverError::Protocol(e.to_string())
}

#[async_trait]
impl Driver for CdpDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Navigation(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn check(&self, locator: &Locator, condition: Condition) -> Result<bool, DriverError> {
        let element = match self.resolve(locator).await {
            Ok(element) => element,
            Err(DriverError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        match condition {
            Condition::Present => Ok(true),
            Condition::Clickable => self.call_bool(&element, CLICKABLE_FN).await,
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let element = self.resolve(locator).await?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| DriverError::NotInteractable(format!("{locator}: {e}")))?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| DriverError::NotInteractable(format!("{locator}: {e}")))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self.resolve(locator).await?;
        element.call_js_fn(CLEAR_FN, false).await.map_err(protocol)?;
        element
            .click()
            .await
            .map_err(|e| DriverError::NotInteractable(format!("{locator}: {e}")))?;
        element
            .type_str(text)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::NotInteractable(format!("{locator}: {e}")))
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let element = self.resolve(locator).await?;
        let returns = element.call_js_fn(TEXT_FN, false).await.map_err(protocol)?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty()))
    }

    async fn type_into_page(&self, keys: &str) -> Result<(), DriverError> {
        let body = self.resolve(&Locator::css("body")).await?;
        body.focus().await.map_err(protocol)?;
        body.type_str(keys).await.map_err(protocol)?;
        body.press_key("Enter").await.map(|_| ()).map_err(protocol)
    }

    async fn release(&self) -> Result<(), DriverError> {
        let mut browser = self.browser.lock().await;
        let Some(mut browser) = browser.take() else {
            return Err(DriverError::Closed);
        };
        let closed = browser.close().await.map(|_| ()).map_err(protocol);
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        closed
    }
}
