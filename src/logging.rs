//! Structured logging for activity-harvester.
//!
//! Uses `tracing` with `tracing-subscriber`. Diagnostics go to stderr so
//! that the status channel can own stdout.
//!
//! ## Environment Variables
//!
//! - `HARVESTER_LOG` or `RUST_LOG`: filter directive (e.g. `activity_harvester=debug,warn`)
//! - `HARVESTER_LOG_FORMAT`: output format (`pretty`, `compact`, `json`)
//!
//! ```bash
//! HARVESTER_LOG=activity_harvester=debug activity-harvester run --headed
//! HARVESTER_LOG_FORMAT=json activity-harvester run
//! ```

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

const DEFAULT_FILTER: &str = "activity_harvester=info,warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// Single-line output
    #[default]
    Compact,
    /// JSON lines for log aggregation
    Json,
}

impl LogFormat {
    /// Parse case-insensitively; unknown names fall back to compact.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive
    pub filter: String,
    pub format: LogFormat,
    /// Emit span open/close events
    pub with_spans: bool,
    /// Include file/line
    pub with_file: bool,
    /// Include the module path
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Compact,
            with_spans: false,
            with_file: false,
            with_target: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let filter = std::env::var("HARVESTER_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());

        let format = std::env::var("HARVESTER_LOG_FORMAT")
            .map(|s| LogFormat::parse(&s))
            .unwrap_or_default();

        // Machine-readable runs also carry span timing and targets.
        let json = format == LogFormat::Json;
        Self {
            filter,
            format,
            with_spans: json,
            with_target: json,
            ..Default::default()
        }
    }

    /// Raise the crate's level for each `-v`; an explicit environment
    /// filter wins.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        let from_env = std::env::var_os("HARVESTER_LOG").is_some() || std::env::var_os("RUST_LOG").is_some();
        if let Some(filter) = verbosity_filter(verbose).filter(|_| !from_env) {
            self.filter = filter.to_string();
        }
        self.with_file |= verbose >= 2;
        self
    }
}

fn verbosity_filter(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("activity_harvester=debug,warn"),
        _ => Some("activity_harvester=trace,chromiumoxide=debug,info"),
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup; later calls are ignored.
pub fn init(config: LogConfig) {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_target(config.with_target);

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(registry.with(layer.json())),
        LogFormat::Compact => tracing::subscriber::set_global_default(registry.with(layer.compact())),
        LogFormat::Pretty => tracing::subscriber::set_global_default(registry.with(layer.pretty())),
    };
}
