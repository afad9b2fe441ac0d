//! Browser driver seam and session bootstrap.
//!
//! The engine talks to the remote UI only through [`Driver`]. The real
//! implementation drives Chromium over CDP (`chromiumoxide`) when the
//! `browser` feature is enabled; tests substitute a scripted double.

pub mod session;

#[cfg(feature = "browser")]
mod cdp;

pub use session::{BrowserOptions, ChromiumLauncher, find_chrome};

#[cfg(feature = "browser")]
pub use cdp::CdpDriver;

use crate::error::{DriverError, HarvestError};
use crate::locator::{Condition, Locator};
use async_trait::async_trait;
use serde_json::Value;

/// Page script returning one entry per `<table>` in document order.
///
/// Each entry is `{ "hasBody": bool, "rows": [[cell text, ...], ...] }`.
/// Rows come from `tbody tr` when present, otherwise from every `tr`.
/// Cell text is the trimmed text of each direct `th`/`td` child.
pub const TABLE_SNAPSHOT_SCRIPT: &str = r#"(function() {
  return Array.from(document.querySelectorAll('table')).map(function(table) {
    var rows = Array.from(table.querySelectorAll('tbody tr'));
    var hasBody = rows.length > 0;
    if (!hasBody) { rows = Array.from(table.querySelectorAll('tr')); }
    return {
      hasBody: hasBody,
      rows: rows.map(function(tr) {
        return Array.from(tr.children)
          .filter(function(c) { return c.tagName === 'TD' || c.tagName === 'TH'; })
          .map(function(c) { return (c.innerText || c.textContent || '').trim(); });
      })
    };
  });
})()"#;

/// Operations the engine needs from a live page.
///
/// Every method takes `&self`: the session is exclusively owned by one
/// engine run, and implementations serialise access internally.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Load `url` in the current tab.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Current document location.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Evaluate a script and return its JSON result (`Null` for `undefined`).
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError>;

    /// Whether `locator` resolves to an element satisfying `condition` right now.
    async fn check(&self, locator: &Locator, condition: Condition) -> Result<bool, DriverError>;

    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Clear the field and type `text` into it.
    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Trimmed text content, `None` when the element has none.
    async fn text(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Send keystrokes to the page body, followed by Enter.
    async fn type_into_page(&self, keys: &str) -> Result<(), DriverError>;

    /// Raw per-table snapshots of the current page.
    async fn snapshot_tables(&self) -> Result<Vec<Value>, DriverError> {
        match self.evaluate(TABLE_SNAPSHOT_SCRIPT).await? {
            Value::Array(tables) => Ok(tables),
            other => Err(DriverError::Script(format!(
                "table snapshot returned {other}, expected an array"
            ))),
        }
    }

    /// Close the browser. Called once by the engine on every exit path.
    async fn release(&self) -> Result<(), DriverError>;
}

/// Acquires a fresh browser session.
#[async_trait]
pub trait Launcher: Send + Sync {
    type Driver: Driver;

    /// Start the browser. Failure leaves nothing running.
    async fn launch(&self) -> Result<Self::Driver, HarvestError>;
}

#[async_trait]
impl<T: Driver + ?Sized> Driver for std::sync::Arc<T> {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        (**self).goto(url).await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        (**self).current_url().await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        (**self).evaluate(script).await
    }

    async fn check(&self, locator: &Locator, condition: Condition) -> Result<bool, DriverError> {
        (**self).check(locator, condition).await
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        (**self).click(locator).await
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        (**self).fill(locator, text).await
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        (**self).text(locator).await
    }

    async fn type_into_page(&self, keys: &str) -> Result<(), DriverError> {
        (**self).type_into_page(keys).await
    }

    async fn snapshot_tables(&self) -> Result<Vec<Value>, DriverError> {
        (**self).snapshot_tables().await
    }

    async fn release(&self) -> Result<(), DriverError> {
        (**self).release().await
    }
}
