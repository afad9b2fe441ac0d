use crate::browser::BrowserOptions;
use crate::filter::FilterPreset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub run: RunDefaults,
    pub browser: BrowserOptions,
    pub timing: Timing,
    pub export: ExportConfig,
}

/// Where the portal lives (`[portal]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Login entry point
    pub login_url: String,
    /// View to harvest after login; empty stays on the landing page
    pub target_url: String,
    /// Account email; the password is never stored here
    pub email: Option<String>,
}

/// Defaults for a run (`[run]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    pub preset: FilterPreset,
    pub apply_filter: bool,
    pub enrich: bool,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            preset: FilterPreset::Today,
            apply_filter: true,
            enrich: true,
        }
    }
}

/// Output shaping (`[export]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output: Option<PathBuf>,
    /// Trailing rows discarded after concatenation
    pub drop_trailing_rows: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output: None,
            drop_trailing_rows: 1,
        }
    }
}

/// Bounded waits and settle delays, in milliseconds (`[timing]`).
///
/// Each call site has its own fixed timeout; nothing here is a global
/// deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub login_link_wait_ms: u64,
    pub login_field_wait_ms: u64,
    pub login_submit_wait_ms: u64,
    pub login_budget_ms: u64,
    pub navigation_wait_ms: u64,
    pub menu_wait_ms: u64,
    pub menu_settle_ms: u64,
    pub menu_after_ms: u64,
    pub filter_click_wait_ms: u64,
    pub filter_picker_wait_ms: u64,
    pub filter_step_settle_ms: u64,
    pub filter_selection_settle_ms: u64,
    pub post_filter_settle_ms: u64,
    pub advance_wait_ms: u64,
    pub advance_settle_ms: u64,
    pub detail_open_wait_ms: u64,
    pub detail_open_settle_ms: u64,
    pub detail_read_settle_ms: u64,
    pub detail_close_settle_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            login_link_wait_ms: 5_000,
            login_field_wait_ms: 10_000,
            login_submit_wait_ms: 5_000,
            login_budget_ms: 10_000,
            navigation_wait_ms: 10_000,
            menu_wait_ms: 5_000,
            menu_settle_ms: 2_000,
            menu_after_ms: 1_000,
            filter_click_wait_ms: 5_000,
            filter_picker_wait_ms: 10_000,
            filter_step_settle_ms: 1_000,
            filter_selection_settle_ms: 2_000,
            post_filter_settle_ms: 10_000,
            advance_wait_ms: 5_000,
            advance_settle_ms: 2_000,
            detail_open_wait_ms: 5_000,
            detail_open_settle_ms: 1_000,
            detail_read_settle_ms: 1_000,
            detail_close_settle_ms: 2_000,
        }
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

impl Config {
    /// Default location: `~/.activity-harvester/config.toml`.
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".activity-harvester").join("config.toml")
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(config_path)
    }
}
