//! Error taxonomy for a harvest run.
//!
//! Every failure the engine can observe is a [`HarvestError`] variant with a
//! fixed [`Severity`]. Non-fatal failures do not escape their scope; they are
//! wrapped in an [`Issue`] and aggregated by the caller so that "degraded but
//! continuing" and "aborted" stay distinguishable in the final report.

use thiserror::Error;

/// How far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Contained to one table or row; the rest of the page is unaffected.
    Isolated,
    /// A best-effort phase failed; the engine continues on the default path.
    Degraded,
    /// The export collaborator failed after the run finished.
    Reported,
    /// The pagination loop stopped; results gathered so far are kept.
    PhaseAborted,
    /// The run is over; the browser is released and the error is returned.
    Fatal,
}

/// Low-level failure reported by a [`crate::browser::Driver`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("element not interactable: {0}")]
    NotInteractable(String),

    #[error("timed out after {millis}ms waiting for {what}")]
    Timeout { what: String, millis: u64 },

    #[error("script failed: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("browser session is closed")]
    Closed,
}

impl DriverError {
    /// Whether repeating the same action may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotInteractable(_) | Self::Protocol(_))
    }
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("failed to start browser: {0}")]
    SessionStart(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("filter could not be applied: {0}")]
    FilterApplication(String),

    #[error("could not read pagination cursor: {0}")]
    CursorRead(String),

    #[error("table #{table} on page {page}: {reason}")]
    TableExtraction { page: u32, table: usize, reason: String },

    #[error("table #{table} row {row} on page {page}: {reason}")]
    RowParse {
        page: u32,
        table: usize,
        row: usize,
        reason: String,
    },

    #[error("enrichment of row {row} on page {page}: {reason}")]
    Enrichment { page: u32, row: usize, reason: String },

    #[error("could not advance past page {page}: {reason}")]
    Advance { page: u32, reason: String },

    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HarvestError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::SessionStart(_) | Self::Authentication(_) | Self::Config(_) => Severity::Fatal,
            Self::Navigation { .. } | Self::FilterApplication(_) => Severity::Degraded,
            Self::CursorRead(_) | Self::Advance { .. } => Severity::PhaseAborted,
            Self::TableExtraction { .. } | Self::RowParse { .. } | Self::Enrichment { .. } => {
                Severity::Isolated
            }
            Self::Export(_) => Severity::Reported,
        }
    }

    /// Whether the failure should also raise a blocking notification.
    pub fn is_alerting(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// A non-fatal failure carried in a run report.
#[derive(Debug)]
pub struct Issue {
    pub severity: Severity,
    pub error: HarvestError,
}

impl From<HarvestError> for Issue {
    fn from(error: HarvestError) -> Self {
        Self {
            severity: error.severity(),
            error,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_follow_propagation_policy() {
        assert_eq!(HarvestError::SessionStart("x".into()).severity(), Severity::Fatal);
        assert_eq!(HarvestError::Authentication("x".into()).severity(), Severity::Fatal);
        assert_eq!(
            HarvestError::FilterApplication("x".into()).severity(),
            Severity::Degraded
        );
        assert_eq!(
            HarvestError::Advance { page: 1, reason: "x".into() }.severity(),
            Severity::PhaseAborted
        );
        assert_eq!(
            HarvestError::Enrichment { page: 1, row: 2, reason: "x".into() }.severity(),
            Severity::Isolated
        );
    }

    #[test]
    fn only_fatal_errors_alert() {
        assert!(HarvestError::Authentication("no indicator".into()).is_alerting());
        assert!(!HarvestError::CursorRead("missing".into()).is_alerting());
        assert!(!HarvestError::Export("disk full".into()).is_alerting());
    }

    #[test]
    fn issue_takes_error_severity() {
        let issue = Issue::from(HarvestError::Navigation {
            url: "https://portal.example/activities".into(),
            reason: "all strategies failed".into(),
        });
        assert_eq!(issue.severity, Severity::Degraded);
    }

    #[test]
    fn transient_driver_errors() {
        assert!(DriverError::NotInteractable("#submit".into()).is_transient());
        assert!(!DriverError::NotFound("#submit".into()).is_transient());
        assert!(!DriverError::Closed.is_transient());
    }
}
