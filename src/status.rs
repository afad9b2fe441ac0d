//! Status channel consumed by the display collaborator.
//!
//! The engine reports progress as an ordered stream of timestamped,
//! human-readable lines. Informational, warning and error lines share one
//! channel; the level is kept only so that sinks can colour or filter them.
//! Fatal failures additionally raise an [`StatusSink::alert`].

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// One line on the status channel.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub at: DateTime<Local>,
    pub level: StatusLevel,
    pub message: String,
}

impl StatusLine {
    pub fn now(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Receiver for status lines and blocking failure notifications.
pub trait StatusSink: Send + Sync {
    fn line(&self, line: StatusLine);

    /// A terminal failure the user must acknowledge.
    fn alert(&self, title: &str, message: &str);

    fn info(&self, message: &str) {
        self.line(StatusLine::now(StatusLevel::Info, message));
    }

    fn warn(&self, message: &str) {
        self.line(StatusLine::now(StatusLevel::Warning, message));
    }

    fn error(&self, message: &str) {
        self.line(StatusLine::now(StatusLevel::Error, message));
    }
}

/// Forwards status lines to `tracing`.
#[derive(Debug, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn line(&self, line: StatusLine) {
        let at = line.at.format("%H:%M:%S").to_string();
        match line.level {
            StatusLevel::Info => tracing::info!(target: "status", at = %at, "{}", line.message),
            StatusLevel::Warning => tracing::warn!(target: "status", at = %at, "{}", line.message),
            StatusLevel::Error => tracing::error!(target: "status", at = %at, "{}", line.message),
        }
    }

    fn alert(&self, title: &str, message: &str) {
        tracing::error!(target: "status", alert = true, "{title}: {message}");
    }
}

/// Keeps every line in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryStatus {
    lines: Mutex<Vec<StatusLine>>,
    alerts: Mutex<Vec<(String, String)>>,
}

impl MemoryStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<StatusLine> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|l| l.message).collect()
    }

    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.message.contains(needle))
    }
}

impl StatusSink for MemoryStatus {
    fn line(&self, line: StatusLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }

    fn alert(&self, title: &str, message: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push((title.to_string(), message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_renders_with_clock_prefix() {
        let line = StatusLine::now(StatusLevel::Info, "Login successful");
        let rendered = line.to_string();
        assert!(rendered.starts_with('['));
        assert_eq!(&rendered[9..11], "] ");
        assert!(rendered.ends_with("Login successful"));
    }

    #[test]
    fn memory_sink_keeps_order_across_levels() {
        let sink = MemoryStatus::new();
        sink.info("first");
        sink.warn("second");
        sink.error("third");
        assert_eq!(sink.messages(), vec!["first", "second", "third"]);
        assert_eq!(sink.lines()[1].level, StatusLevel::Warning);
    }
}
