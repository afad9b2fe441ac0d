//! Run orchestration.
//!
//! One run owns one browser session from launch to release:
//!
//! ```text
//! launch -> authenticate -> navigate -> open search view -> filter
//!        -> paginate (+ enrich) -> assemble -> release
//! ```
//!
//! Authentication and launch failures are fatal. Every other failure is
//! recorded as an [`Issue`] and the run continues on the default path.

use crate::auth::{Authenticator, Credentials};
use crate::browser::{BrowserOptions, Driver, Launcher};
use crate::config::{Config, Timing};
use crate::dataset::{Assembly, Dataset, assemble};
use crate::error::{HarvestError, Issue};
use crate::extract::{PaginationExtractor, StopReason};
use crate::filter::{FilterApplicator, FilterPreset};
use crate::interact::Interactor;
use crate::navigate::Navigator;
use crate::schema::{ExportRules, Schema};
use crate::status::StatusSink;
use tracing::{info, warn};

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct HarvestRequest {
    pub credentials: Credentials,
    pub login_url: String,
    /// Empty stays on the post-login page.
    pub target_url: String,
    /// `None` skips the filter panel.
    pub preset: Option<FilterPreset>,
    pub enrich: bool,
    pub browser: BrowserOptions,
    pub timing: Timing,
    pub schema: Schema,
    pub rules: ExportRules,
}

impl HarvestRequest {
    pub fn from_config(config: &Config, credentials: Credentials) -> Self {
        Self {
            credentials,
            login_url: config.portal.login_url.clone(),
            target_url: config.portal.target_url.clone(),
            preset: config.run.apply_filter.then_some(config.run.preset),
            enrich: config.run.enrich,
            browser: config.browser.clone(),
            timing: config.timing.clone(),
            schema: Schema::activity(),
            rules: ExportRules::activity(config.export.drop_trailing_rows),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Harvested(Dataset),
    /// No table produced a batch.
    NoData,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Non-fatal failures, in the order they happened.
    pub issues: Vec<Issue>,
    pub pages_visited: u32,
    pub stop: StopReason,
}

pub struct Engine;

impl Engine {
    /// Execute one harvest. The browser is released exactly once on every
    /// path that launched it.
    pub async fn run<L: Launcher>(
        launcher: &L,
        request: &HarvestRequest,
        status: &dyn StatusSink,
    ) -> Result<RunReport, HarvestError> {
        status.info("Starting browser...");
        let driver = match launcher.launch().await {
            Ok(driver) => driver,
            Err(error) => {
                Self::report_fatal(&error, status);
                return Err(error);
            }
        };

        let result = Self::harvest(&driver, request, status).await;

        match driver.release().await {
            Ok(()) => status.info("Browser closed."),
            Err(e) => warn!(error = %e, "Browser did not close cleanly"),
        }

        result.inspect_err(|error| Self::report_fatal(error, status))
    }

    async fn harvest<D: Driver>(
        driver: &D,
        request: &HarvestRequest,
        status: &dyn StatusSink,
    ) -> Result<RunReport, HarvestError> {
        let timing = &request.timing;
        let interactor = Interactor::new(driver, &request.browser);
        let mut issues: Vec<Issue> = Vec::new();

        Authenticator::new(&request.login_url, timing)
            .authenticate(&interactor, &request.credentials, status)
            .await?;

        let navigator = Navigator::new(timing);
        if let Err(error) = navigator
            .navigate(&interactor, &request.target_url, status)
            .await
        {
            issues.push(error.into());
        }
        if let Err(error) = navigator.open_search_view(&interactor, status).await {
            issues.push(error.into());
        }

        match request.preset {
            Some(preset) => {
                if let Err(error) = FilterApplicator::new(timing)
                    .apply(&interactor, preset, status)
                    .await
                {
                    issues.push(error.into());
                }
            }
            None => status.info("Filter skipped."),
        }

        status.info("Starting extraction...");
        let report = PaginationExtractor::new(&request.schema, timing)
            .with_enrichment(request.enrich)
            .run(&interactor, status)
            .await;
        issues.extend(report.issues);

        let outcome = match assemble(report.arena, &request.schema, &request.rules) {
            Assembly::Dataset(dataset) => {
                status.info(&format!("Collected {} rows.", dataset.len()));
                RunOutcome::Harvested(dataset)
            }
            Assembly::Empty => {
                status.warn("No data extracted.");
                RunOutcome::NoData
            }
        };

        info!(
            pages = report.pages_visited,
            issues = issues.len(),
            stop = %report.stop,
            "Harvest finished"
        );
        Ok(RunReport {
            outcome,
            issues,
            pages_visited: report.pages_visited,
            stop: report.stop,
        })
    }

    fn report_fatal(error: &HarvestError, status: &dyn StatusSink) {
        status.error(&error.to_string());
        if error.is_alerting() {
            let title = match error {
                HarvestError::Authentication(_) => "Login failed",
                HarvestError::SessionStart(_) => "Browser failed",
                _ => "Error",
            };
            status.alert(title, &error.to_string());
        }
    }
}
