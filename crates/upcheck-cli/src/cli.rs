//! CLI command definitions and argument parsing

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use upcheck::{
    CheckTrigger, HttpTransport, PersistedState, UpdateCheckSession, UpdateScheduler, UrlBuilder,
};

use crate::config::{CliOverrides, Config};
use crate::output::{CheckReport, OutputFormat, OutputFormatter};
use crate::ExitCode;

/// upcheck - query an update server for newer add-on versions
#[derive(Parser, Debug)]
#[command(name = "upcheck")]
#[command(version, about = "Query an update server for newer add-on versions")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: table, json, quiet
    #[arg(long, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, env = "UPCHECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Add-on name
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Installed add-on version
    #[arg(long = "addon-version", global = true)]
    pub addon_version: Option<String>,

    /// Host application
    #[arg(long, global = true)]
    pub application: Option<String>,

    /// Host application version
    #[arg(long = "application-version", global = true)]
    pub application_version: Option<String>,

    /// Use the development build update URL
    #[arg(long, global = true)]
    pub devbuild: bool,

    /// State file path
    #[arg(long = "state-file", env = "UPCHECK_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,
}

impl Cli {
    /// Overrides collected from command-line flags
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            debug: self.debug.then_some(true),
            name: self.name.clone(),
            version: self.addon_version.clone(),
            application: self.application.clone(),
            application_version: self.application_version.clone(),
            development_build: self.devbuild.then_some(true),
            state_path: self.state_file.clone(),
        }
    }

    /// Execute the CLI command with a pre-loaded configuration
    pub async fn execute_with_config(self, config: Config) -> anyhow::Result<ExitCode> {
        let formatter = OutputFormatter::new(self.output);
        match self.command {
            Commands::Check(args) => args.execute(&config, formatter).await,
            Commands::Watch(args) => args.execute(&config, formatter).await,
            Commands::State(args) => args.execute(&config, formatter),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one update check
    Check(CheckArgs),
    /// Run automatic checks on the configured schedule until interrupted
    Watch(WatchArgs),
    /// Show or reset persisted rollout state
    State(StateArgs),
}

/// Build the scheduler described by the configuration
pub fn build_scheduler(config: &Config) -> anyhow::Result<UpdateScheduler> {
    let updater = config.resolved_updater();
    let prefs = config.preferences.load()?;
    let transport = HttpTransport::new(&updater.network)?;

    let session = UpdateCheckSession::new(
        config.identity.to_identity(),
        Arc::new(prefs),
        Arc::new(config.identity.environment()),
        Arc::new(transport),
    )
    .with_url_builder(UrlBuilder::new(updater.check_codes.clone()));

    Ok(UpdateScheduler::new(Arc::new(session), &updater)?)
}

fn print(text: Option<String>) {
    if let Some(text) = text {
        println!("{text}");
    }
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Report the check as automatic instead of manual
    #[arg(long)]
    pub automatic: bool,
}

impl CheckArgs {
    pub async fn execute(
        self,
        config: &Config,
        formatter: OutputFormatter,
    ) -> anyhow::Result<ExitCode> {
        if let Err(e) = config.require_identity() {
            eprintln!("Error: {e}");
            return Ok(ExitCode::InvalidInput);
        }

        let scheduler = build_scheduler(config)?;
        let trigger = if self.automatic {
            CheckTrigger::Automatic
        } else {
            CheckTrigger::Manual
        };

        let outcome = scheduler.check(trigger).await;
        print(formatter.check(&CheckReport::from_outcome(&outcome)));
        Ok(ExitCode::from_outcome(&outcome))
    }
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Run the first check immediately instead of after the initial delay
    #[arg(long)]
    pub now: bool,
}

impl WatchArgs {
    pub async fn execute(
        self,
        config: &Config,
        formatter: OutputFormatter,
    ) -> anyhow::Result<ExitCode> {
        if let Err(e) = config.require_identity() {
            eprintln!("Error: {e}");
            return Ok(ExitCode::InvalidInput);
        }

        let mut config = config.clone();
        config.updater.schedule.enabled = true;
        if self.now {
            config.updater.schedule.initial_delay_secs = 0;
        }

        let scheduler = build_scheduler(&config)?;
        scheduler.add_update_listener(move |url| {
            print(formatter.check(&CheckReport {
                update_available: true,
                version: None,
                url: Some(url.to_string()),
                scope_key: None,
                error: String::new(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            }));
        });

        scheduler.start()?;
        info!(
            interval_hours = config.updater.schedule.check_interval_hours,
            "Watching for updates, press Ctrl-C to stop"
        );

        tokio::signal::ctrl_c().await?;
        scheduler.stop();
        info!("Stopped watching for updates");
        Ok(ExitCode::Success)
    }
}

/// Arguments for the state command
#[derive(Parser, Debug)]
pub struct StateArgs {
    /// Delete the persisted state
    #[arg(long)]
    pub reset: bool,
}

impl StateArgs {
    pub fn execute(self, config: &Config, formatter: OutputFormatter) -> anyhow::Result<ExitCode> {
        let Some(path) = config.state_path() else {
            eprintln!("Error: no state file location available");
            return Ok(ExitCode::InvalidInput);
        };

        if self.reset {
            if path.exists() {
                std::fs::remove_file(&path)?;
                info!(path = %path.display(), "Update state reset");
            } else {
                warn!(path = %path.display(), "No update state to reset");
            }
        }

        let state = PersistedState::load(&path)?;
        print(formatter.state(&state));
        Ok(ExitCode::Success)
    }
}
