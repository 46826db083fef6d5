//! Crawler module
//!
//! This module contains the crawl core:
//! - `ListingPager`: the listing's "load more" loop
//! - `ReviewPaginator`: review pages walked in a secondary browsing context
//! - `DetailCrawler`: one detail page turned into a record batch
//! - `CrawlSession`: the orchestrator tying them to the incremental sink
//! - HTTP fetching of static detail pages

mod detail;
mod fetcher;
mod listing;
mod reviews;
mod session;

pub use detail::DetailCrawler;
pub use fetcher::{build_http_client, fetch_page, FetchError};
pub use listing::ListingPager;
pub use reviews::{ReviewPages, ReviewPaginator};
pub use session::{CrawlSession, SessionReport};

use crate::browser::ChromeBrowser;
use crate::config::Config;
use crate::extract::TomatoLayout;
use crate::sink::{IncrementalSink, RetryPolicy, SheetsStore, SnapshotWriter};
use crate::storage::open_journal;
use crate::HarvestError;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Knobs of a single run that do not belong in the configuration file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_hash: String,
    /// Forget journaled records, cursors and processed identifiers first
    pub fresh: bool,
    pub cancel: Arc<AtomicBool>,
}

/// Runs a complete harvest with the production backends
///
/// This will:
/// 1. Read the remote store credential from the environment
/// 2. Open the journal and restore the datasets
/// 3. Launch the browser
/// 4. Run the crawl session
/// 5. Shut the browser down, whatever the session outcome
///
/// # Example
///
/// ```no_run
/// use reel_harvest::config::load_config;
/// use reel_harvest::crawler::{run_crawl, RunOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_crawl(&config, RunOptions::default()).await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, options: RunOptions) -> crate::Result<SessionReport> {
    let token = std::env::var(&config.remote.token_env)
        .map_err(|_| HarvestError::MissingCredential(config.remote.token_env.clone()))?;

    let mut journal = open_journal(config.output.journal_path.as_deref().map(Path::new))?;
    if options.fresh {
        tracing::info!("Fresh run requested, clearing the journal");
        journal.clear()?;
    }

    let store = SheetsStore::new(&config.remote, token)?;
    let snapshots = SnapshotWriter::new(&config.output.snapshot_dir)?;
    let sink = IncrementalSink::with_journal(
        store,
        snapshots,
        RetryPolicy::from(&config.remote),
        journal,
    )?;
    let client = build_http_client(&config.crawler)?;

    let browser = ChromeBrowser::launch(&config.browser).await?;
    let layout = TomatoLayout::new();

    let outcome = {
        let mut session = CrawlSession::new(&browser, &layout, config, client, sink)
            .with_config_hash(options.config_hash)
            .with_cancellation(options.cancel);
        session.run().await
    };

    browser.shutdown().await;
    outcome
}
