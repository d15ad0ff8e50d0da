//! Ward CLI - console end-to-end test harness
//!
//! Usage:
//!   ward run-suite [SUITE] [-- ARGS]   Run a suite's targets in sequence
//!   ward setup                         Create output dirs and pre-authenticate
//!   ward teardown                      Remove auth state and write run summaries
//!   ward summary                       Print and write the run summary
//!   ward data show|cleanup             Inspect or clean the fixture data store
//!   ward init                          Write default .ward/config.toml

mod suite;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ward_browser::{BrowserDriver, ChromeDriver};
use ward_core::{Environment, WardConfig, WardSettings};
use ward_data::TestDataManager;
use ward_fixtures::{global_setup, global_teardown, SetupOptions};
use ward_report::{ResultStore, RunSummary};

use crate::suite::{SuiteConfig, SuiteRunner};

#[derive(Parser)]
#[command(name = "ward")]
#[command(author, version, about = "End-to-end test harness for the management console")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Repository root holding .ward/, .env and test-suites.json
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the targets of a suite one after another
    RunSuite {
        /// Suite name from test-suites.json
        #[arg(default_value = "auth")]
        suite: String,

        /// Retries per failed target (defaults to WARD_RETRIES, or 2 on CI)
        #[arg(long)]
        retries: Option<u32>,

        /// Extra arguments passed through to every target run
        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Create output directories, check the deployment and save auth state
    Setup {
        /// Skip the BASE_URL reachability check
        #[arg(long)]
        offline: bool,

        /// Skip launching a browser to pre-authenticate
        #[arg(long)]
        no_auth: bool,
    },

    /// Delete temporary auth state and write run summaries
    Teardown,

    /// Summarize recorded outcomes
    Summary,

    /// Fixture data store
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },

    /// Write default settings to .ward/config.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Print the merged fixture data
    Show,

    /// Remove temporary entities and forget created users
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dotenv = cli.root.join(".env");
    if dotenv.exists() {
        dotenvy::from_path(&dotenv).with_context(|| format!("Failed to load {}", dotenv.display()))?;
    }

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::RunSuite { suite, retries, extra } => cmd_run_suite(&cli.root, suite, retries, extra).await,
        Commands::Setup { offline, no_auth } => cmd_setup(&cli.root, offline, no_auth).await,
        Commands::Teardown => cmd_teardown(&cli.root).await,
        Commands::Summary => cmd_summary(&cli.root).await,
        Commands::Data { action } => cmd_data(&cli.root, action),
        Commands::Init { force } => cmd_init(&cli.root, force),
    }
}

fn load_settings(root: &Path) -> Result<WardSettings> {
    let mut settings = WardSettings::load_or_default(root).context("Failed to load .ward/config.toml")?;
    settings.paths = settings.paths.rooted_at(root);
    Ok(settings)
}

fn load_config(root: &Path) -> Result<WardConfig> {
    WardConfig::from_env_with_settings(&Environment::from_process(), load_settings(root)?)
        .context("Incomplete environment, see .env")
}

async fn cmd_run_suite(root: &Path, suite: String, retries: Option<u32>, extra: Vec<String>) -> Result<()> {
    let settings = load_settings(root)?;
    let config_path = root.join(&settings.suites.config_path);

    let suites = match SuiteConfig::load(&config_path) {
        Ok(suites) => suites,
        Err(e) => {
            eprintln!("{}", format!("❌ Error: {:#}", e).red());
            std::process::exit(1);
        }
    };

    let Some(targets) = suites.sequence(&suite) else {
        eprintln!(
            "{}",
            format!("❌ Error: Suite \"{}\" not found in {}!", suite, config_path.display()).red()
        );
        println!("Available suites: {}", suites.names().join(", "));
        std::process::exit(1);
    };

    let env = Environment::from_process();
    let retries = match retries {
        Some(n) => n,
        None => match env.optional_parsed::<u32>("WARD_RETRIES")? {
            Some(n) => n,
            None if env.flag("CI") => 2,
            None => 0,
        },
    };

    let runner = SuiteRunner {
        command: settings.suites.runner_command.clone(),
        retries,
        workdir: root.to_path_buf(),
    };
    let outcome = runner.run(&suite, targets, &extra).await?;

    if !outcome.passed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_setup(root: &Path, offline: bool, no_auth: bool) -> Result<()> {
    let config = load_config(root)?;
    let options = SetupOptions {
        preflight_attempts: if offline { 0 } else { SetupOptions::default().preflight_attempts },
        pre_authenticate: !no_auth,
        ..Default::default()
    };

    let driver: Option<Arc<dyn BrowserDriver>> = if no_auth {
        None
    } else {
        match ChromeDriver::launch(&config.settings.browser, config.page_timeout) {
            Ok(driver) => Some(Arc::new(driver) as Arc<dyn BrowserDriver>),
            Err(e) => {
                warn!("⚠️ Could not launch browser, skipping pre-authentication: {}", e);
                None
            }
        }
    };

    if let Some(video) = &config.record_video {
        warn!("RECORD_VIDEO={} is not supported by the Chrome backend; screenshots only", video);
    }

    let report = global_setup(&config, driver.as_deref(), &options).await?;
    if let Some(path) = &report.auth_state {
        println!("{} {}", "🔐 Auth state:".green(), path.display());
    }
    Ok(())
}

async fn cmd_teardown(root: &Path) -> Result<()> {
    let config = load_config(root)?;
    let report = global_teardown(&config).await;
    for path in &report.deleted {
        println!("🗑️ {}", path.display());
    }
    if let Some(path) = &report.summary_path {
        println!("{} {}", "📊 Summary:".green(), path.display());
    }
    Ok(())
}

async fn cmd_summary(root: &Path) -> Result<()> {
    let settings = load_settings(root)?;
    let store = ResultStore::in_dir(&settings.paths.reports_dir);

    let outcomes = store.load_all().await?;
    if outcomes.is_empty() {
        println!("No results recorded in {}", store.path().display());
        return Ok(());
    }

    let summary = RunSummary::from_outcomes(outcomes);
    summary.log_console_summary();
    let (json, html) = summary.write(&settings.paths.reports_dir)?;

    let rate = format!("{}%", summary.stats.success_rate());
    let rate = if summary.stats.is_success() { rate.green() } else { rate.red() };
    println!("📊 Success Rate: {}", rate);
    println!("   {}", json.display());
    println!("   {}", html.display());
    Ok(())
}

fn cmd_data(root: &Path, action: DataCommands) -> Result<()> {
    let config = load_config(root)?;
    let manager = TestDataManager::from_config(&config);

    match action {
        DataCommands::Show => {
            let data = manager.get_all_test_data()?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        DataCommands::Cleanup => {
            let report = manager.cleanup()?;
            info!("Cleaned fixture data at {}", manager.store_path().display());
            println!(
                "{} {} users, {} machines, {} repositories, {} created users",
                "🧹 Removed".green(),
                report.users,
                report.machines,
                report.repositories,
                report.created_users
            );
        }
    }
    Ok(())
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let config_path = root.join(".ward/config.toml");
    if config_path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", config_path.display());
        return Ok(());
    }

    let path = WardSettings::write_default(root)?;
    println!("Initialized Ward in {}", root.display());
    println!("Created:");
    println!("  {}", path.display());
    Ok(())
}
