//! Command-line front end for refuel logs.
//!
//! Provides commands for:
//! - Printing a monthly spending summary of a refuel log
//! - Watching a refuel log and redrawing the summary on every change

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use rf_core::{CategorySet, Config, FuelFilter, LoadError, aggregate, parse_document};
use rf_pipeline::{IngestionPipeline, PipelineError};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod render;

use render::{ChartOptions, SummaryReport, TerminalObserver, render_chart};

// ============================================================================
// CLI ARGUMENT TYPES
// ============================================================================

/// Summaries and live charts of refuel logs.
#[derive(Parser)]
#[command(name = "refuel", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Refuel log to read (`category|price|amount|dd.MM.yyyy` per line)
    #[arg(short, long, global = true, env = "REFUEL_FILE")]
    file: Option<Utf8PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true, env = "REFUEL_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the monthly spending summary once
    Summary {
        /// Fuel type to chart, or ALL
        #[arg(long)]
        fuel: Option<FuelFilter>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Redraw the summary whenever the file changes
    Watch {
        /// Fuel type to chart, or ALL
        #[arg(long)]
        fuel: Option<FuelFilter>,
    },
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Text bar chart
    #[default]
    Text,
    /// JSON report
    Json,
}

// ============================================================================
// INITIALIZATION FUNCTIONS
// ============================================================================

/// Initialize the tracing subscriber for logging.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Load the configuration file, or defaults when none is given.
fn load_config(path: Option<&Utf8Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).wrap_err_with(|| format!("Failed to load configuration {path}"))
        }
        None => {
            debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

fn require_file(file: Option<Utf8PathBuf>) -> Result<Utf8PathBuf> {
    file.ok_or_else(|| eyre!("No refuel file given. Pass --file or set REFUEL_FILE"))
}

// ============================================================================
// COMMAND IMPLEMENTATIONS
// ============================================================================

/// Print the summary of a refuel log once.
async fn run_summary(
    file: &Utf8Path,
    filter: &FuelFilter,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let output = summarize(file, filter, format, config).await?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = handle.write_all(output.as_bytes());

    Ok(())
}

/// Read, parse and render a refuel log in the requested format.
async fn summarize(
    file: &Utf8Path,
    filter: &FuelFilter,
    format: OutputFormat,
    config: &Config,
) -> Result<String> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| LoadError::read(file, e))?;
    let records = parse_document(&text)?;
    let categories = CategorySet::from_records(&records);
    info!(path = %file, records = records.len(), "Refuel file loaded");

    if !categories.contains(filter) {
        warn!(filter = %filter, "Filter matches no category in the file");
    }

    let options = ChartOptions::from(&config.report);
    let output = match format {
        OutputFormat::Text => {
            let totals = aggregate(&records, filter);
            render_chart(&totals, filter, &categories, options)
        }
        OutputFormat::Json => {
            let report = SummaryReport::new(&records, filter, &categories, options);
            let mut json = serde_json::to_string_pretty(&report)?;
            json.push('\n');
            json
        }
    };

    Ok(output)
}

/// Watch a refuel log and redraw the summary on every change.
async fn run_watch(file: &Utf8Path, filter: FuelFilter, config: Config) -> Result<()> {
    let options = ChartOptions::from(&config.report);
    let observer = TerminalObserver::new(std::io::stdout(), filter, options);
    let mut pipeline = IngestionPipeline::new(config.watch, observer);

    let report = pipeline
        .load_file(file)
        .await
        .wrap_err_with(|| format!("Failed to load {file}"))?;
    if report.watching {
        info!(path = %file, "Watching for changes (Ctrl+C to stop)");
    } else {
        warn!(path = %file, status = ?pipeline.watch_status(), "Live updates unavailable");
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = pipeline.next_signal() => {
                match pipeline.handle_signal(signal).await {
                    Ok(Some(report)) => debug!(records = report.records, "Chart redrawn"),
                    Ok(None) => {}
                    Err(PipelineError::Watch(error)) => {
                        warn!(error = %error, "Watcher stopped, showing last loaded data");
                    }
                    Err(error) => debug!(error = %error, "Reload rejected"),
                }
            }
            result = &mut shutdown => {
                result.wrap_err("Failed to listen for shutdown signals")?;
                info!("Shutting down");
                break;
            }
        }
    }

    pipeline.reset().await;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let terminate = {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        async move {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        () = terminate => {
            info!("Received SIGTERM");
            Ok(())
        }
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Step 1: Install color-eyre for better error reports
    color_eyre::install()?;

    // Step 2: Parse CLI arguments
    let cli = Cli::parse();

    // Step 3: Initialize tracing
    init_tracing(cli.verbose, cli.no_color);

    let config = load_config(cli.config.as_deref())?;

    // Step 4: Route to command handler
    match cli.command {
        Commands::Summary { fuel, format } => {
            let file = require_file(cli.file)?;
            let filter = fuel.unwrap_or_else(|| config.report.default_filter.clone());
            run_summary(&file, &filter, format, &config).await
        }
        Commands::Watch { fuel } => {
            let file = require_file(cli.file)?;
            let filter = fuel.unwrap_or_else(|| config.report.default_filter.clone());
            run_watch(&file, filter, config).await
        }
    }
}
