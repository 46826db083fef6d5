//! Reel-Harvest main entry point
//!
//! This is the command-line interface for the Reel-Harvest listing harvester.

use anyhow::Context;
use clap::Parser;
use reel_harvest::config::{load_config_with_hash, Config};
use reel_harvest::crawler::{run_crawl, RunOptions};
use reel_harvest::records::DatasetKind;
use reel_harvest::storage::open_journal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Reel-Harvest: an incremental movie-listing harvester
///
/// Reel-Harvest pages through a movie listing, harvests cast, metadata and reviews
/// from every detail page, and keeps a remote spreadsheet and local CSV snapshots in
/// sync without ever sending the same row twice.
#[derive(Parser, Debug)]
#[command(name = "reel-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental movie-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget journaled records and cursors before harvesting
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    fresh: bool,

    /// Validate config and show the harvest plan without running it
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show journal statistics and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reel_harvest=info,warn"),
            1 => EnvFilter::new("reel_harvest=debug,info"),
            2 => EnvFilter::new("reel_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &Config) {
    println!("=== Reel-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Entry URL: {}", config.crawler.entry_url);
    println!("  Max review pages: {}", config.crawler.max_review_pages);
    match config.crawler.max_detail_pages {
        Some(max) => println!("  Max detail pages: {}", max),
        None => println!("  Max detail pages: unlimited"),
    }
    println!("  Max stalled rounds: {}", config.crawler.max_stalled_rounds);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nReadiness:");
    println!("  Timeout: {}ms", config.readiness.timeout_ms);
    println!("  Poll interval: {}ms", config.readiness.poll_interval_ms);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    if let Some(executable) = &config.browser.executable {
        println!("  Executable: {}", executable);
    }

    println!("\nRemote Store:");
    println!("  Endpoint: {}", config.remote.endpoint);
    println!("  Spreadsheet: {}", config.remote.spreadsheet_id);
    let token_state = if std::env::var_os(&config.remote.token_env).is_some() {
        "set"
    } else {
        "NOT SET"
    };
    println!("  Token variable: {} ({})", config.remote.token_env, token_state);
    println!(
        "  Retries: {} attempts, {}ms..{}ms backoff",
        config.remote.max_attempts, config.remote.initial_backoff_ms, config.remote.max_backoff_ms
    );

    println!("\nOutput:");
    println!("  Snapshots: {}", config.output.snapshot_dir);
    match &config.output.journal_path {
        Some(path) => println!("  Journal: {}", path),
        None => println!("  Journal: in memory (cursors reset every run)"),
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start harvesting from {}", config.crawler.entry_url);
}

/// Handles the --stats mode: shows what the journal holds
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.output.journal_path.as_deref() else {
        println!("No journal configured; nothing survives between runs.");
        return Ok(());
    };

    println!("Journal: {}\n", path);
    let journal = open_journal(Some(Path::new(path)))
        .with_context(|| format!("opening journal {}", path))?;

    if let Some(run) = journal.latest_run()? {
        println!(
            "Latest run: #{} started {} ({})",
            run.id,
            run.started_at,
            run.status.to_db_string()
        );
        if let Some(finished) = run.finished_at {
            println!("  Finished: {}", finished);
        }
    }

    println!("Detail pages processed: {}", journal.count_processed()?);
    println!("\n{:<10} {:>10} {:>10} {:>10}", "Dataset", "Records", "Delivered", "Pending");
    for kind in DatasetKind::ALL {
        let records = journal.count_records(kind)?;
        let delivered = journal.load_cursor(kind)? as u64;
        println!(
            "{:<10} {:>10} {:>10} {:>10}",
            kind.sheet_name(),
            records,
            delivered,
            records.saturating_sub(delivered)
        );
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_crawl(config: &Config, config_hash: String, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (journal will be cleared)");
    } else {
        tracing::info!("Starting harvest (journaled cursors are resumed)");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing the current detail page");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let options = RunOptions {
        config_hash,
        fresh,
        cancel,
    };

    match run_crawl(config, options).await {
        Ok(report) => {
            tracing::info!("Harvest completed: {}", report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
