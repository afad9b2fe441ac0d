use crate::config::Config;
use crate::filter::FilterPreset;
use clap::{ArgAction, Args};
use std::path::PathBuf;

// Global flags shared across every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to a config.toml file
    #[arg(
        short = 'c',
        long,
        value_name = "PATH",
        env = "HARVESTER_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Disable coloured terminal output
    #[arg(long = "no-color", action = ArgAction::SetTrue, env = "NO_COLOR", global = true)]
    pub no_color: bool,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Flags of `activity-harvester run`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Account email
    #[arg(long, value_name = "EMAIL", env = "HARVESTER_EMAIL")]
    pub email: Option<String>,

    /// Account password; prompted for when absent
    #[arg(long, value_name = "PASSWORD", env = "HARVESTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Page to harvest after login
    #[arg(long = "url", value_name = "URL", env = "HARVESTER_TARGET_URL")]
    pub target_url: Option<String>,

    /// Login entry point
    #[arg(long, value_name = "URL", env = "HARVESTER_LOGIN_URL")]
    pub login_url: Option<String>,

    /// Date range to select in the filter panel
    #[arg(long, value_enum)]
    pub preset: Option<FilterPreset>,

    /// CSV file to write (default: activities_<timestamp>.csv)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Leave the filter panel untouched
    #[arg(long = "no-filter", action = ArgAction::SetTrue)]
    pub no_filter: bool,

    /// Skip per-row detail lookups
    #[arg(long = "no-enrich", action = ArgAction::SetTrue)]
    pub no_enrich: bool,

    /// Show the browser window
    #[arg(long, action = ArgAction::SetTrue)]
    pub headed: bool,

    /// Trailing rows to discard from the dataset
    #[arg(long, value_name = "N")]
    pub drop_trailing: Option<usize>,
}

impl RunArgs {
    /// Apply flag overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(email) = &self.email {
            config.portal.email = Some(email.clone());
        }
        if let Some(url) = &self.target_url {
            config.portal.target_url = url.clone();
        }
        if let Some(url) = &self.login_url {
            config.portal.login_url = url.clone();
        }
        if let Some(preset) = self.preset {
            config.run.preset = preset;
        }
        if self.no_filter {
            config.run.apply_filter = false;
        }
        if self.no_enrich {
            config.run.enrich = false;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(output) = &self.output {
            config.export.output = Some(output.clone());
        }
        if let Some(rows) = self.drop_trailing {
            config.export.drop_trailing_rows = rows;
        }
    }
}
