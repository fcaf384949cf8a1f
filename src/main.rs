//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site mirror.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_mirror::browser::WaitCondition;
use sumi_mirror::config::{read_config_with_hash, validate, Config, FailurePolicy};
use sumi_mirror::crawler::{crawl, CrawlOutcome, CrawlReport};
use sumi_mirror::output::{generate_markdown_report, print_report, write_json_report};
use sumi_mirror::MirrorError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Output directory used when neither the config file nor `--output` names one
const DEFAULT_OUTPUT_DIRECTORY: &str = "./mirror";

/// Sumi-Mirror: a browser-driven website mirror
///
/// Sumi-Mirror loads every same-origin page reachable from an entrypoint in a
/// real browser, writes each response the page loads to a local directory
/// tree, and follows same-origin links until the site is exhausted.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version = "1.0.0")]
#[command(about = "A browser-driven website mirror", long_about = None)]
struct Cli {
    /// URL to start mirroring from (overrides the config file)
    #[arg(value_name = "ENTRYPOINT")]
    entrypoint: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to write the mirror into
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Load milestone to wait for on each page (load, dom-content-loaded)
    #[arg(long, value_name = "EVENT")]
    wait_until: Option<WaitCondition>,

    /// Per-navigation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Stop at the first navigation, fetch, or write failure
    #[arg(long)]
    abort_on_failure: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without launching a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the final configuration from the config file and command line flags
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = read_config_with_hash(path)
                .with_context(|| format!("reading {}", path.display()))?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config
        }
        None => {
            let entrypoint = cli
                .entrypoint
                .clone()
                .context("an entrypoint URL is required when no --config is given")?;
            Config::new(entrypoint, DEFAULT_OUTPUT_DIRECTORY)
        }
    };

    apply_overrides(&mut config, cli);
    validate(&config)?;

    Ok(config)
}

/// Command line flags take precedence over file values
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(entrypoint) = &cli.entrypoint {
        config.crawl.entrypoint = entrypoint.clone();
    }
    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }
    if let Some(wait) = cli.wait_until {
        config.crawl.wait_until = wait;
    }
    if let Some(timeout) = cli.timeout_ms {
        config.crawl.navigation_timeout_ms = Some(timeout);
    }
    if cli.abort_on_failure {
        config.crawl.on_failure = FailurePolicy::Abort;
    }
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Entrypoint: {}", config.crawl.entrypoint);
    println!("  Wait until: {}", config.crawl.wait_until);
    match config.crawl.navigation_timeout_ms {
        Some(ms) => println!("  Navigation timeout: {}ms", ms),
        None => println!("  Navigation timeout: none"),
    }
    println!("  On failure: {}", config.crawl.on_failure);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    if let Some(path) = &config.output.report_path {
        println!("  Markdown report: {}", path);
    }
    if let Some(path) = &config.output.json_report_path {
        println!("  JSON report: {}", path);
    }

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    match &config.browser.executable {
        Some(path) => println!("  Executable: {}", path),
        None => println!("  Executable: auto-detect"),
    }
    if !config.browser.args.is_empty() {
        println!("  Extra args: {}", config.browser.args.join(" "));
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_signal.cancel();
        }
    });

    let report = match crawl(&config, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    write_reports(&config, &report)?;
    print_report(&report);

    match report.outcome {
        CrawlOutcome::Aborted => {
            let (url, message) = report
                .abort_cause()
                .map(|cause| (cause.url.clone(), cause.message.clone()))
                .unwrap_or_else(|| (report.entrypoint.clone(), "unknown failure".to_string()));
            Err(MirrorError::Aborted { url, message }.into())
        }
        CrawlOutcome::Cancelled => {
            tracing::info!("Crawl cancelled; partial mirror kept");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Writes the configured markdown and JSON reports
fn write_reports(config: &Config, report: &CrawlReport) -> anyhow::Result<()> {
    if let Some(path) = &config.output.report_path {
        generate_markdown_report(report, Path::new(path))
            .with_context(|| format!("writing markdown report to {}", path))?;
        tracing::info!("Markdown report written to {}", path);
    }

    if let Some(path) = &config.output.json_report_path {
        write_json_report(report, Path::new(path))
            .with_context(|| format!("writing JSON report to {}", path))?;
        tracing::info!("JSON report written to {}", path);
    }

    Ok(())
}
