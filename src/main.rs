use activity_harvester::args::{CommonArgs, RunArgs};
use activity_harvester::browser::ChromiumLauncher;
use activity_harvester::config::Config;
use activity_harvester::export::{CsvSink, DatasetSink, default_file_name};
use activity_harvester::filter::PRESET_TABLE;
use activity_harvester::logging::{self, LogConfig, LogFormat};
use activity_harvester::status::{StatusSink, TracingStatus};
use activity_harvester::theme::{self as t, ConsoleStatus};
use activity_harvester::{Credentials, Engine, HarvestRequest, RunOutcome};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// ── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "activity-harvester",
    version,
    about = "Harvest the activity grid of the field-service portal into a CSV file"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in, filter, page through the grid and export it
    Run(RunArgs),
    /// List the date range presets and their picker positions
    Presets,
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    t::init_color(cli.common.no_color);

    let log_config = LogConfig::from_env().with_verbosity(cli.common.verbose);
    let machine_output = log_config.format == LogFormat::Json;
    logging::init(log_config);

    let config_path = cli.common.config.clone();
    let mut config = Config::load(config_path.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Presets => {
            println!("{}", t::heading("Date range presets"));
            for (preset, label, ordinal) in PRESET_TABLE {
                println!("  {ordinal}  {:<16} {}", preset.to_string(), t::muted(label));
            }
            Ok(())
        }
        Commands::InitConfig { force } => {
            let path = config_path.unwrap_or_else(Config::default_path);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let written = Config::default().save(Some(path.as_path()))?;
            println!("{}", t::icon_ok(&format!("Wrote {}", written.display())));
            Ok(())
        }
        Commands::Run(args) => {
            args.apply_overrides(&mut config);
            let credentials = resolve_credentials(&config, &args)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            if machine_output {
                runtime.block_on(run(config, credentials, &TracingStatus))
            } else {
                runtime.block_on(run(config, credentials, &ConsoleStatus))
            }
        }
    }
}

fn resolve_credentials(config: &Config, args: &RunArgs) -> Result<Credentials> {
    let Some(email) = config.portal.email.clone().filter(|e| !e.trim().is_empty()) else {
        bail!("no account email: pass --email, set HARVESTER_EMAIL or portal.email");
    };
    let password = match &args.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password(format!("Password for {email}: "))
            .context("reading password")?,
    };
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(Credentials::new(email, password))
}

async fn run(config: Config, credentials: Credentials, status: &dyn StatusSink) -> Result<()> {
    let output = config
        .export
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_file_name(chrono::Local::now())));
    let request = HarvestRequest::from_config(&config, credentials);
    let launcher = ChromiumLauncher::new(config.browser.clone());

    let report = Engine::run(&launcher, &request, status).await?;

    if !report.issues.is_empty() {
        eprintln!(
            "{}",
            t::icon_warn(&format!(
                "{} issue(s) during the run ({} page(s) visited, stopped: {})",
                report.issues.len(),
                report.pages_visited,
                report.stop
            ))
        );
        for issue in &report.issues {
            eprintln!("  {} {}", t::muted(&format!("[{}]", issue.severity)), issue.error);
        }
    }

    match report.outcome {
        RunOutcome::Harvested(dataset) => {
            let sink = CsvSink::new(output);
            if let Err(error) = sink.write(&dataset) {
                status.error(&error.to_string());
                return Err(error.into());
            }
            println!(
                "{}",
                t::icon_ok(&format!("{} rows written", dataset.len()))
            );
            println!("{}", t::label_value("File", &sink.path().display().to_string()));
        }
        RunOutcome::NoData => {
            println!("{}", t::icon_warn("No data extracted, nothing written."));
        }
    }
    Ok(())
}
