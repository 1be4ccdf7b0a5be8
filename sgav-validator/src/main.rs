//! sgav-validator - Singapore address validation CLI
//!
//! Validates free-form Singapore addresses against OneMap (postal lookup)
//! and StreetDirectory (property classification), printing one JSON report
//! per address on stdout. Logs go to stderr.
//!
//! Exit status: 0 when every address produced a result, 2 when any request
//! failed with a pipeline error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sgav_common::config::{write_toml_config, ConfigResolver, TomlConfig};
use sgav_validator::config::{build_fixture_pipeline, build_live_pipeline};
use sgav_validator::services::FixtureData;
use sgav_validator::workflow::{ValidationPipeline, ValidationReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Command-line arguments for sgav-validator
#[derive(Parser, Debug)]
#[command(name = "sgav-validator")]
#[command(about = "Normalize and validate Singapore addresses")]
#[command(version)]
struct Args {
    /// Config file (overrides SGAV_CONFIG and the platform default)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serve lookups from a JSON fixture file instead of the live providers
    #[arg(long, global = true, value_name = "PATH")]
    fixtures: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a single address
    Validate {
        /// Raw address text
        address: String,
    },
    /// Validate one address per line of a file
    Batch {
        /// Input file, one address per non-empty line
        file: PathBuf,

        /// Maximum requests in flight
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Write the effective configuration to a file
    Config {
        #[arg(long, value_name = "PATH")]
        write: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logging first so config resolution warnings are visible
    let log_filter = init_logging();

    let resolver = ConfigResolver::new(args.config.clone());
    let config = resolver.load().context("Failed to load configuration")?;
    apply_configured_level(&log_filter, &config.logging.level)?;

    match resolver.resolve_path() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }

    match args.command {
        Command::Config { write } => {
            write_toml_config(&config, &write)
                .with_context(|| format!("Failed to write config to {}", write.display()))?;
            info!("Configuration written to {}", write.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { address } => {
            let pipeline = build_pipeline(&config, args.fixtures.as_deref())?;
            let report = ValidationReport::new(address.clone(), pipeline.validate(&address).await);
            print_report(&report)?;
            Ok(exit_code(report.is_failure()))
        }
        Command::Batch { file, concurrency } => {
            let pipeline = build_pipeline(&config, args.fixtures.as_deref())?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let inputs: Vec<&str> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();

            info!(addresses = inputs.len(), concurrency, "Starting batch validation");

            let outcomes = pipeline.validate_batch(inputs.iter().copied(), concurrency).await;
            let mut any_failed = false;
            for (raw, outcome) in inputs.iter().zip(outcomes) {
                let report = ValidationReport::new(*raw, outcome);
                any_failed |= report.is_failure();
                print_report(&report)?;
            }
            Ok(exit_code(any_failed))
        }
    }
}

/// Install stderr logging. RUST_LOG wins; until the config is read the
/// level is `info`.
fn init_logging() -> LogFilterHandle {
    let (filter, handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// Switch to the configured level unless RUST_LOG chose one
fn apply_configured_level(handle: &LogFilterHandle, level: &str) -> Result<()> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(());
    }
    handle
        .reload(EnvFilter::new(level))
        .context("Failed to apply configured log level")
}

fn build_pipeline(config: &TomlConfig, fixtures: Option<&Path>) -> Result<ValidationPipeline> {
    match fixtures {
        Some(path) => {
            let data = FixtureData::load(path).context("Failed to load fixtures")?;
            info!(
                records = data.records.len(),
                properties = data.properties.len(),
                "Using fixture providers"
            );
            build_fixture_pipeline(config, data).context("Failed to build pipeline")
        }
        None => build_live_pipeline(config).context("Failed to build pipeline"),
    }
}

fn print_report(report: &ValidationReport) -> Result<()> {
    let line = serde_json::to_string(report).context("Failed to serialize report")?;
    println!("{}", line);
    Ok(())
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
