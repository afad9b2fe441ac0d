//! Reaching the target view after login.

use crate::browser::Driver;
use crate::config::{Timing, ms};
use crate::error::HarvestError;
use crate::interact::{Interactor, Step};
use crate::status::StatusSink;
use crate::targets;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Ways of loading a URL, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum NavStrategy {
    #[strum(to_string = "direct navigation")]
    Direct,
    #[strum(to_string = "script navigation")]
    Script,
    #[strum(to_string = "address bar entry")]
    AddressBar,
}

impl NavStrategy {
    pub const ORDER: [NavStrategy; 3] = [Self::Direct, Self::Script, Self::AddressBar];
}

pub struct Navigator<'a> {
    timing: &'a Timing,
}

impl<'a> Navigator<'a> {
    pub fn new(timing: &'a Timing) -> Self {
        Self { timing }
    }

    /// Load `target_url`, falling through the strategies until the location
    /// changes. Returns the winning strategy, or `None` when there was
    /// nothing to do.
    pub async fn navigate<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        target_url: &str,
        status: &dyn StatusSink,
    ) -> Result<Option<NavStrategy>, HarvestError> {
        let target_url = target_url.trim();
        if target_url.is_empty() {
            status.info("No target URL given, staying on the landing page.");
            return Ok(None);
        }

        let driver = interactor.driver();
        let wait = ms(self.timing.navigation_wait_ms);
        for strategy in NavStrategy::ORDER {
            let prior = driver.current_url().await.unwrap_or_default();
            if prior == target_url {
                status.info("Already on the target page.");
                return Ok(None);
            }

            status.info(&format!("Navigating to target page ({strategy})..."));
            let attempt = match strategy {
                NavStrategy::Direct => driver.goto(target_url).await,
                NavStrategy::Script => driver.evaluate(&location_script(target_url)).await.map(|_| ()),
                NavStrategy::AddressBar => driver.type_into_page(target_url).await,
            };
            if let Err(e) = attempt {
                warn!(strategy = %strategy, error = %e, "Navigation strategy failed");
                status.warn(&format!("{strategy} failed: {e}"));
                continue;
            }

            match wait_for_change(driver, &prior, wait, interactor.poll_interval()).await {
                Some(now) => {
                    check_arrival(target_url, &now, status);
                    return Ok(Some(strategy));
                }
                None => {
                    status.warn(&format!("{strategy} did not change the page."));
                }
            }
        }

        let error = HarvestError::Navigation {
            url: target_url.to_string(),
            reason: "all strategies failed".to_string(),
        };
        status.error(&error.to_string());
        Err(error)
    }

    /// Click through the activity menu to the search view.
    pub async fn open_search_view<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        status: &dyn StatusSink,
    ) -> Result<(), HarvestError> {
        let t = self.timing;
        let steps = [
            Step::pause(ms(t.menu_settle_ms)),
            Step::click(targets::activity_menu())
                .within(ms(t.menu_wait_ms))
                .settle(ms(t.menu_settle_ms)),
            Step::click(targets::activity_search_entry())
                .within(ms(t.menu_wait_ms))
                .settle(ms(t.menu_after_ms)),
        ];
        match interactor.run_all(&steps).await {
            Ok(()) => {
                status.info("Opened the activity search view.");
                Ok(())
            }
            Err(failure) => {
                status.warn("Activity menu not available, proceeding directly.");
                let url = interactor.driver().current_url().await.unwrap_or_default();
                Err(HarvestError::Navigation {
                    url,
                    reason: format!("search view: {failure}"),
                })
            }
        }
    }
}

/// `window.location.href = "<url>";` with the URL safely quoted.
pub fn location_script(url: &str) -> String {
    let quoted = serde_json::Value::String(url.to_string()).to_string();
    format!("window.location.href = {quoted};")
}

async fn wait_for_change<D: Driver + ?Sized>(
    driver: &D,
    prior: &str,
    timeout: Duration,
    poll: Duration,
) -> Option<String> {
    let deadline = Instant::now() + timeout;
    loop {
        match driver.current_url().await {
            Ok(now) if now != prior => return Some(now),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Could not read location"),
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

/// Last non-empty path segment, ignoring query and fragment.
fn last_segment(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, path) = path.split_once('/')?;
    path.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}

fn check_arrival(target_url: &str, current_url: &str, status: &dyn StatusSink) {
    let Some(segment) = last_segment(target_url) else {
        status.info("Navigation complete.");
        return;
    };
    if current_url.to_lowercase().contains(&segment.to_lowercase()) {
        status.info("Navigation complete.");
    } else {
        warn!(expected = segment, current = current_url, "Location does not match target");
        status.warn(&format!(
            "Landed on {current_url}, which does not look like '{segment}'."
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserOptions;
    use crate::error::DriverError;
    use crate::status::MemoryStatus;
    use crate::testing::FakeDriver;

    const TARGET: &str = "https://portal.example/app/Activities?view=grid";

    async fn go(driver: &FakeDriver) -> (Result<Option<NavStrategy>, HarvestError>, MemoryStatus) {
        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(driver, &BrowserOptions::default());
        let result = Navigator::new(&timing).navigate(&interactor, TARGET, &status).await;
        (result, status)
    }

    #[test]
    fn location_script_quotes_url() {
        assert_eq!(
            location_script("https://a.example/x?q=\"1\""),
            r#"window.location.href = "https://a.example/x?q=\"1\"";"#
        );
    }

    #[test]
    fn last_segment_ignores_query_and_slash() {
        assert_eq!(last_segment(TARGET), Some("Activities"));
        assert_eq!(last_segment("https://a.example/a/b/"), Some("b"));
        assert_eq!(last_segment("https://a.example"), None);
        assert_eq!(last_segment("https://a.example/"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_navigation_wins() {
        let driver = FakeDriver::new();
        driver.set_url("https://portal.example/dashboard");
        let (result, status) = go(&driver).await;
        assert_eq!(result.unwrap(), Some(NavStrategy::Direct));
        assert!(status.contains("Navigation complete."));
        assert!(driver.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn falls_through_to_script_when_goto_errors() {
        let driver = FakeDriver::new();
        driver.fail_goto(DriverError::Navigation("net::ERR_ABORTED".into()));
        let (result, _) = go(&driver).await;
        assert_eq!(result.unwrap(), Some(NavStrategy::Script));
        assert_eq!(driver.url(), TARGET);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_through_to_address_bar_when_location_is_unchanged() {
        let driver = FakeDriver::new();
        driver.navigation(false, false, true);
        let (result, status) = go(&driver).await;
        assert_eq!(result.unwrap(), Some(NavStrategy::AddressBar));
        assert_eq!(driver.typed(), vec![TARGET]);
        assert!(status.contains("direct navigation did not change the page."));
        assert!(status.contains("script navigation did not change the page."));
    }

    #[tokio::test(start_paused = true)]
    async fn all_strategies_failing_is_a_navigation_error() {
        let driver = FakeDriver::new();
        driver.navigation(false, false, false);
        let (result, _) = go(&driver).await;
        assert!(matches!(result, Err(HarvestError::Navigation { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_arrival_is_only_a_warning() {
        let driver = FakeDriver::new();
        driver.redirect_goto("https://portal.example/app/Home");
        let (result, status) = go(&driver).await;
        assert_eq!(result.unwrap(), Some(NavStrategy::Direct));
        assert!(status.contains("does not look like 'Activities'"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_target_skips() {
        let driver = FakeDriver::new();
        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(&driver, &BrowserOptions::default());
        let result = Navigator::new(&timing).navigate(&interactor, "  ", &status).await;
        assert_eq!(result.unwrap(), None);
        assert!(driver.gotos().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_menu_is_reported() {
        let driver = FakeDriver::new();
        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(&driver, &BrowserOptions::default());
        let result = Navigator::new(&timing).open_search_view(&interactor, &status).await;
        assert!(matches!(result, Err(HarvestError::Navigation { reason, .. }) if reason.contains("activity menu")));
        assert!(status.contains("proceeding directly"));
    }
}
