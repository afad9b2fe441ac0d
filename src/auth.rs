//! Login form submission and success detection.

use crate::browser::Driver;
use crate::config::{Timing, ms};
use crate::error::HarvestError;
use crate::interact::Interactor;
use crate::locator::Condition;
use crate::status::StatusSink;
use crate::targets;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Account credentials. The password is wiped on drop and never printed.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The first sign of a logged-in page that was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIndicator {
    /// The location contained the dashboard marker.
    Url(String),
    /// A logged-in element appeared.
    Element(&'static str),
}

impl fmt::Display for LoginIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "url {url}"),
            Self::Element(name) => write!(f, "{name}"),
        }
    }
}

pub struct Authenticator<'a> {
    login_url: &'a str,
    timing: &'a Timing,
}

impl<'a> Authenticator<'a> {
    pub fn new(login_url: &'a str, timing: &'a Timing) -> Self {
        Self { login_url, timing }
    }

    /// Open the login page, submit the credentials and wait for a logged-in
    /// page. Every failure is an [`HarvestError::Authentication`].
    pub async fn authenticate<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        credentials: &Credentials,
        status: &dyn StatusSink,
    ) -> Result<LoginIndicator, HarvestError> {
        let t = self.timing;
        if self.login_url.is_empty() {
            return Err(HarvestError::Config("portal.login_url is not set".to_string()));
        }

        status.info("Opening login page...");
        interactor
            .driver()
            .goto(self.login_url)
            .await
            .map_err(|e| HarvestError::Authentication(format!("could not open login page: {e}")))?;

        let back = targets::return_to_login();
        if interactor
            .appears(&back, Condition::Clickable, ms(t.login_link_wait_ms))
            .await
        {
            match interactor.click(&back, ms(t.login_link_wait_ms)).await {
                Ok(()) => status.info("Clicked 'torna a login'."),
                Err(e) => warn!(error = %e, "Return-to-login link did not respond"),
            }
        } else {
            status.info("'torna a login' link not found, continuing.");
        }

        interactor
            .fill(&targets::email_field(), credentials.email(), ms(t.login_field_wait_ms))
            .await
            .map_err(|e| HarvestError::Authentication(format!("email field: {e}")))?;
        interactor
            .fill(
                &targets::password_field(),
                credentials.password(),
                interactor.implicit_wait(),
            )
            .await
            .map_err(|e| HarvestError::Authentication(format!("password field: {e}")))?;
        status.info("Credentials entered.");

        interactor
            .click(&targets::login_submit(), ms(t.login_submit_wait_ms))
            .await
            .map_err(|e| HarvestError::Authentication(format!("login button: {e}")))?;
        status.info("Login submitted, waiting for the portal...");

        let indicator = self.wait_for_login(interactor).await?;
        info!(indicator = %indicator, "Logged in");
        status.info(&format!("Login successful ({indicator})."));
        Ok(indicator)
    }

    /// Poll the URL marker and every indicator target once per round, in
    /// order, until one matches or the login budget runs out.
    async fn wait_for_login<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
    ) -> Result<LoginIndicator, HarvestError> {
        let budget = ms(self.timing.login_budget_ms);
        let deadline = Instant::now() + budget;
        let indicators = targets::login_indicators();
        let driver = interactor.driver();

        loop {
            match driver.current_url().await {
                Ok(url) if url.to_lowercase().contains(targets::LOGIN_URL_MARKER) => {
                    return Ok(LoginIndicator::Url(url));
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Could not read location"),
            }

            for indicator in &indicators {
                if interactor
                    .appears(indicator, Condition::Present, Duration::ZERO)
                    .await
                {
                    return Ok(LoginIndicator::Element(indicator.name));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(HarvestError::Authentication(format!(
                    "no login indicator within {}s",
                    budget.as_secs()
                )));
            }
            tokio::time::sleep(interactor.poll_interval().min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserOptions;
    use crate::locator::Locator;
    use crate::status::MemoryStatus;
    use crate::testing::{Effect, FakeDriver};

    const LOGIN: &str = "https://portal.example/login";

    async fn login(driver: &FakeDriver) -> (Result<LoginIndicator, HarvestError>, MemoryStatus) {
        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(driver, &BrowserOptions::default());
        let result = Authenticator::new(LOGIN, &timing)
            .authenticate(&interactor, &Credentials::new("ops@example.com", "s3cret"), &status)
            .await;
        (result, status)
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("ops@example.com", "s3cret"));
        assert!(rendered.contains("ops@example.com"));
        assert!(!rendered.contains("s3cret"));
    }

    #[tokio::test(start_paused = true)]
    async fn dashboard_url_wins() {
        let driver = FakeDriver::with_login("https://portal.example/Dashboard/home");
        let (result, status) = login(&driver).await;

        assert_eq!(
            result.unwrap(),
            LoginIndicator::Url("https://portal.example/Dashboard/home".to_string())
        );
        assert_eq!(driver.gotos(), vec![LOGIN]);
        let fills = driver.fills();
        assert_eq!(fills[0], (Locator::id("email"), "ops@example.com".to_string()));
        assert_eq!(fills[1].1, "s3cret");
        assert!(status.contains("'torna a login' link not found"));
        assert!(!status.messages().iter().any(|m| m.contains("s3cret")));
    }

    #[tokio::test(start_paused = true)]
    async fn element_indicator_is_reported() {
        let driver = FakeDriver::with_login("https://portal.example/home");
        let submit = targets::login_submit().locators[0].clone();
        driver.on_click(
            &submit,
            Effect::Show(Locator::css("[href*='logout'], [onclick*='logout']")),
        );

        let (result, _) = login(&driver).await;
        assert_eq!(result.unwrap(), LoginIndicator::Element("logout control"));
    }

    #[tokio::test(start_paused = true)]
    async fn later_indicators_are_checked_within_the_budget() {
        let driver = FakeDriver::with_login("https://portal.example/home");
        let submit = targets::login_submit().locators[0].clone();
        driver.on_click(&submit, Effect::Show(Locator::css(".user-avatar")));

        let started = Instant::now();
        let (result, _) = login(&driver).await;
        assert_eq!(result.unwrap(), LoginIndicator::Element("user avatar"));
        assert!(started.elapsed() < ms(Timing::default().login_budget_ms));
    }

    #[tokio::test(start_paused = true)]
    async fn indicators_match_in_declared_order() {
        let driver = FakeDriver::with_login("https://portal.example/home");
        let submit = targets::login_submit().locators[0].clone();
        driver.on_click(&submit, Effect::Show(Locator::id("user-menu")));
        driver.on_click(&submit, Effect::Show(Locator::css(".user-avatar")));

        let (result, _) = login(&driver).await;
        assert_eq!(result.unwrap(), LoginIndicator::Element("user avatar"));
    }

    #[tokio::test(start_paused = true)]
    async fn return_to_login_is_clicked_when_present() {
        let driver = FakeDriver::with_login("https://portal.example/dashboard");
        let back = targets::return_to_login().locators[0].clone();
        driver.show(&back);

        let (result, status) = login(&driver).await;
        assert!(result.is_ok());
        assert_eq!(driver.clicks()[0], back);
        assert!(status.contains("Clicked 'torna a login'."));
    }

    #[tokio::test(start_paused = true)]
    async fn no_indicator_times_out() {
        let driver = FakeDriver::with_login("https://portal.example/login?error=1");
        let started = Instant::now();
        let (result, _) = login(&driver).await;

        assert!(matches!(result, Err(HarvestError::Authentication(m)) if m.contains("no login indicator")));
        assert!(started.elapsed() >= ms(Timing::default().login_budget_ms));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_email_field_fails() {
        let driver = FakeDriver::new();
        let (result, _) = login(&driver).await;
        assert!(matches!(result, Err(HarvestError::Authentication(m)) if m.starts_with("email field")));
    }
}
