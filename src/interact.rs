//! Interaction executor.
//!
//! Page interactions are `{locate, act, settle}` steps run by one executor,
//! so waiting, retry and settling behave the same at every call site.

use crate::browser::{BrowserOptions, Driver};
use crate::error::DriverError;
use crate::locator::{Condition, Locator, Target};
use crate::retry::{RetryAttempt, RetryPolicy, retry_driver};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How a step finds its element.
#[derive(Debug, Clone)]
pub struct Locate {
    pub target: Target,
    pub condition: Condition,
    /// Bounded wait; `None` uses the session's implicit wait.
    pub timeout: Option<Duration>,
}

/// What a step does once located.
#[derive(Debug, Clone)]
pub enum Act {
    Click,
    Fill(String),
    ReadText,
    Script(String),
    Pause,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub locate: Option<Locate>,
    pub act: Act,
    pub settle: Duration,
}

impl Step {
    pub fn click(target: Target) -> Self {
        Self::located(target, Condition::Clickable, Act::Click)
    }

    pub fn fill(target: Target, text: impl Into<String>) -> Self {
        Self::located(target, Condition::Present, Act::Fill(text.into()))
    }

    pub fn read(target: Target) -> Self {
        Self::located(target, Condition::Present, Act::ReadText)
    }

    pub fn script(js: impl Into<String>) -> Self {
        Self {
            locate: None,
            act: Act::Script(js.into()),
            settle: Duration::ZERO,
        }
    }

    pub fn pause(duration: Duration) -> Self {
        Self {
            locate: None,
            act: Act::Pause,
            settle: duration,
        }
    }

    fn located(target: Target, condition: Condition, act: Act) -> Self {
        Self {
            locate: Some(Locate {
                target,
                condition,
                timeout: None,
            }),
            act,
            settle: Duration::ZERO,
        }
    }

    /// Wait at most `timeout` for the element.
    pub fn within(mut self, timeout: Duration) -> Self {
        if let Some(locate) = self.locate.as_mut() {
            locate.timeout = Some(timeout);
        }
        self
    }

    /// Sleep `duration` after acting.
    pub fn settle(mut self, duration: Duration) -> Self {
        self.settle = duration;
        self
    }

    /// Short name for logs.
    pub fn describe(&self) -> String {
        match (&self.act, &self.locate) {
            (Act::Pause, _) => format!("pause {}ms", self.settle.as_millis()),
            (Act::Script(_), _) => "page script".to_string(),
            (Act::Click, Some(l)) => format!("click {}", l.target),
            (Act::Fill(_), Some(l)) => format!("fill {}", l.target),
            (Act::ReadText, Some(l)) => format!("read {}", l.target),
            (_, None) => "unlocated step".to_string(),
        }
    }
}

/// A step that failed, with its position in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub index: usize,
    pub step: String,
    pub error: DriverError,
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({}): {}", self.index + 1, self.step, self.error)
    }
}

/// Runs steps against one driver with a uniform wait and retry policy.
pub struct Interactor<'a, D: Driver + ?Sized> {
    driver: &'a D,
    implicit_wait: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<'a, D: Driver + ?Sized> Interactor<'a, D> {
    pub fn new(driver: &'a D, options: &BrowserOptions) -> Self {
        Self {
            driver,
            implicit_wait: options.implicit_wait(),
            poll_interval: options.poll_interval(),
            retry: RetryPolicy::interaction_default(),
        }
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    pub fn implicit_wait(&self) -> Duration {
        self.implicit_wait
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll the target's locators in priority order until one satisfies
    /// `condition`, or `timeout` elapses. Always checks at least once.
    pub async fn wait_for(
        &self,
        target: &Target,
        condition: Condition,
        timeout: Duration,
    ) -> Result<Locator, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            for locator in &target.locators {
                match self.driver.check(locator, condition).await {
                    Ok(true) => return Ok(locator.clone()),
                    Ok(false) => {}
                    Err(e) if e.is_transient() => {
                        debug!(target = target.name, locator = %locator, error = %e, "Element check failed");
                    }
                    Err(e) => return Err(e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DriverError::Timeout {
                    what: format!("{} to be {}", target.name, condition),
                    millis: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Whether the target appears within `timeout`.
    pub async fn appears(&self, target: &Target, condition: Condition, timeout: Duration) -> bool {
        self.wait_for(target, condition, timeout).await.is_ok()
    }

    pub async fn click(&self, target: &Target, timeout: Duration) -> Result<(), DriverError> {
        self.run(&Step::click(target.clone()).within(timeout))
            .await
            .map(|_| ())
    }

    /// Wait for a field and type `text` into it without copying it into a step.
    pub async fn fill(&self, target: &Target, text: &str, timeout: Duration) -> Result<(), DriverError> {
        let locator = self.wait_for(target, Condition::Present, timeout).await?;
        let driver = self.driver;
        let locator = &locator;
        retry_driver(
            &self.retry,
            move || driver.fill(locator, text),
            |info| debug!(attempt = info.attempt, reason = %info.reason, "Retrying fill"),
        )
        .await
    }

    /// Execute one step. Returns the text read by [`Act::ReadText`].
    pub async fn run(&self, step: &Step) -> Result<Option<String>, DriverError> {
        let locator = match &step.locate {
            Some(locate) => {
                let timeout = locate.timeout.unwrap_or(self.implicit_wait);
                Some(self.wait_for(&locate.target, locate.condition, timeout).await?)
            }
            None => None,
        };

        let driver = self.driver;
        let on_retry = |info: RetryAttempt| {
            debug!(
                step = %step.describe(),
                attempt = info.attempt,
                reason = %info.reason,
                "Retrying step"
            );
        };

        let output = match (&step.act, locator.as_ref()) {
            (Act::Pause, _) => None,
            (Act::Script(js), _) => {
                let js = js.as_str();
                retry_driver(
                    &self.retry,
                    move || driver.evaluate(js),
                    on_retry,
                )
                .await?;
                None
            }
            (Act::Click, Some(locator)) => {
                retry_driver(
                    &self.retry,
                    move || driver.click(locator),
                    on_retry,
                )
                .await?;
                None
            }
            (Act::Fill(text), Some(locator)) => {
                let text = text.as_str();
                retry_driver(
                    &self.retry,
                    move || driver.fill(locator, text),
                    on_retry,
                )
                .await?;
                None
            }
            (Act::ReadText, Some(locator)) => {
                retry_driver(
                    &self.retry,
                    move || driver.text(locator),
                    on_retry,
                )
                .await?
            }
            (_, None) => {
                return Err(DriverError::NotFound(format!(
                    "{} has no target",
                    step.describe()
                )));
            }
        };

        if !step.settle.is_zero() {
            tokio::time::sleep(step.settle).await;
        }
        Ok(output)
    }

    /// Execute steps in order, stopping at the first failure.
    pub async fn run_all(&self, steps: &[Step]) -> Result<(), StepFailure> {
        for (index, step) in steps.iter().enumerate() {
            if let Err(error) = self.run(step).await {
                return Err(StepFailure {
                    index,
                    step: step.describe(),
                    error,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDriver;

    fn options() -> BrowserOptions {
        BrowserOptions {
            poll_interval_ms: 100,
            implicit_wait_ms: 1_000,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_prefers_first_matching_locator() {
        let driver = FakeDriver::new();
        driver.show(&Locator::css("button[id*='btn-login']"));
        let target = crate::targets::login_submit();

        let interactor = Interactor::new(&driver, &options());
        let found = interactor
            .wait_for(&target, Condition::Clickable, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(found, Locator::css("button[id*='btn-login']"));

        driver.show(&Locator::text("button", "accedi"));
        let found = interactor
            .wait_for(&target, Condition::Clickable, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(found, Locator::text("button", "accedi"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_times_out() {
        let driver = FakeDriver::new();
        let interactor = Interactor::new(&driver, &options());
        let started = Instant::now();
        let err = interactor
            .wait_for(&crate::targets::email_field(), Condition::Present, Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout { millis: 3000, .. }));
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn run_all_reports_failing_step() {
        let driver = FakeDriver::new();
        let present = Target::new("present", vec![Locator::id("a")]);
        let missing = Target::new("missing", vec![Locator::id("b")]);
        driver.show(&Locator::id("a"));

        let interactor = Interactor::new(&driver, &options());
        let failure = interactor
            .run_all(&[
                Step::click(present).settle(Duration::from_millis(500)),
                Step::click(missing).within(Duration::from_millis(300)),
            ])
            .await
            .unwrap_err();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.step, "click missing");
        assert_eq!(driver.clicks(), vec![Locator::id("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn read_returns_text() {
        let driver = FakeDriver::new();
        driver.set_text(&Locator::id("value"), "INC-42");
        let interactor = Interactor::new(&driver, &options());
        let text = interactor
            .run(&Step::read(Target::new("value", vec![Locator::id("value")])))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("INC-42"));
    }
}
