//! Crawl session - orchestration of one harvest
//!
//! The session owns the primary browsing context and the sink. It:
//! - opens the primary context and loads the listing entry page (both fatal on failure)
//! - drives the listing pager round by round
//! - hands every new identifier to the detail crawler
//! - ingests each detail batch and flushes all datasets right after
//! - honours cancellation between identifiers

use crate::browser::{Browser, BrowsingContext, Readiness};
use crate::config::Config;
use crate::crawler::detail::DetailCrawler;
use crate::crawler::listing::ListingPager;
use crate::crawler::reviews::ReviewPaginator;
use crate::extract::SiteLayout;
use crate::records::DatasetKind;
use crate::sink::{IncrementalSink, TabularStore};
use crate::storage::RunStatus;
use crate::url::session_base;
use crate::HarvestError;
use reqwest::Client;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// What a session did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Identifiers taken up before the session stopped, skipped ones included
    pub discovered: usize,
    /// Identifiers already processed by an earlier run
    pub skipped: usize,
    /// Detail pages harvested and ingested
    pub processed: usize,
    /// Detail pages that could not be fetched
    pub failed: usize,
    pub flush_failures: usize,
    /// Delivered cursor of each dataset at the end of the session
    pub delivered: Vec<(DatasetKind, usize)>,
    /// Records still waiting for delivery at the end of the session
    pub pending: Vec<(DatasetKind, usize)>,
    pub cancelled: bool,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} discovered, {} processed, {} skipped, {} failed, {} flush failures",
            self.discovered, self.processed, self.skipped, self.failed, self.flush_failures
        )?;
        for ((kind, delivered), (_, pending)) in self.delivered.iter().zip(&self.pending) {
            write!(f, "; {} {} delivered/{} pending", kind, delivered, pending)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// One harvest over one listing
pub struct CrawlSession<'a, B, S, L: ?Sized> {
    browser: &'a B,
    layout: &'a L,
    config: &'a Config,
    client: Client,
    sink: IncrementalSink<S>,
    config_hash: String,
    cancel: Arc<AtomicBool>,
}

impl<'a, B, S, L> CrawlSession<'a, B, S, L>
where
    B: Browser,
    S: TabularStore,
    L: SiteLayout + ?Sized,
{
    pub fn new(
        browser: &'a B,
        layout: &'a L,
        config: &'a Config,
        client: Client,
        sink: IncrementalSink<S>,
    ) -> Self {
        Self {
            browser,
            layout,
            config,
            client,
            sink,
            config_hash: String::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Records the configuration hash on the journaled run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Shares a flag that stops the session at the next identifier boundary
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn sink(&self) -> &IncrementalSink<S> {
        &self.sink
    }

    pub fn into_sink(self) -> IncrementalSink<S> {
        self.sink
    }

    /// Runs the session to completion
    ///
    /// Only losing the primary context or the entry page is an error; everything else
    /// is logged and reflected in the report.
    pub async fn run(&mut self) -> crate::Result<SessionReport> {
        let start_time = Instant::now();
        let entry_url = self.config.crawler.entry_url.clone();
        let base = session_base(&entry_url)?;

        let primary = self.browser.open_context().await?;
        let run_id = self.sink.begin_run(&self.config_hash);
        if let Some(run_id) = run_id {
            tracing::info!("Starting session run {}", run_id);
        }

        let mut report = SessionReport::default();
        let outcome = self.crawl(&primary, &entry_url, &base, &mut report).await;

        if let Err(e) = self.browser.close_context(primary).await {
            tracing::warn!("Failed to close primary context: {}", e);
        }

        // Retry anything a failed flush left behind
        let last = self.sink.flush_all().await;
        report.flush_failures += last.failures.len();

        for kind in DatasetKind::ALL {
            report.delivered.push((kind, self.sink.delivered(kind)));
            report.pending.push((kind, self.sink.pending(kind)));
        }

        if let Some(run_id) = run_id {
            let status = match (&outcome, report.cancelled) {
                (Err(_), _) => RunStatus::Failed,
                (Ok(()), true) => RunStatus::Interrupted,
                (Ok(()), false) => RunStatus::Completed,
            };
            self.sink.finish_run(run_id, status);
        }

        outcome?;

        tracing::info!(
            "Session finished in {:?}: {}",
            start_time.elapsed(),
            report
        );
        Ok(report)
    }

    async fn crawl(
        &mut self,
        primary: &B::Context,
        entry_url: &str,
        base: &Url,
        report: &mut SessionReport,
    ) -> crate::Result<()> {
        primary
            .goto(entry_url)
            .await
            .map_err(|e| HarvestError::EntryUnavailable {
                url: entry_url.to_string(),
                message: e.to_string(),
            })?;
        if let Err(e) = primary.stop_loading().await {
            tracing::debug!("Could not stop loading the listing: {}", e);
        }

        let readiness = Readiness::from(&self.config.readiness);
        let crawler = &self.config.crawler;
        let mut pager = ListingPager::new(
            self.layout,
            base.clone(),
            readiness,
            crawler.max_stalled_rounds,
        );
        let paginator =
            ReviewPaginator::new(self.browser, self.layout, readiness, crawler.max_review_pages);
        let detail = DetailCrawler::new(&self.client, self.layout, base, paginator);
        let max_detail_pages = crawler.max_detail_pages.map(|n| n as usize);

        'listing: loop {
            let batch = match pager.next_batch(primary).await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Listing navigation failed, ending discovery: {}", e);
                    break;
                }
            };

            for identifier in batch {
                if self.cancel.load(Ordering::SeqCst) {
                    tracing::info!("Cancellation requested, stopping before {}", identifier);
                    report.cancelled = true;
                    break 'listing;
                }
                if max_detail_pages.is_some_and(|max| report.processed >= max) {
                    tracing::info!("Reached the limit of {} detail pages", report.processed);
                    break 'listing;
                }
                report.discovered += 1;

                if self.sink.is_processed(&identifier) {
                    tracing::debug!("Already harvested {}, skipping", identifier);
                    report.skipped += 1;
                    continue;
                }

                let harvested = detail.process(&identifier).await;
                if harvested.movie.is_none() {
                    report.failed += 1;
                    continue;
                }

                match self.sink.ingest(&identifier, harvested) {
                    Ok(_) => report.processed += 1,
                    Err(e) => {
                        tracing::error!("Could not ingest {}: {}", identifier, e);
                        report.failed += 1;
                        continue;
                    }
                }

                let flushed = self.sink.flush_all().await;
                report.flush_failures += flushed.failures.len();

                if report.processed % 10 == 0 {
                    tracing::info!(
                        "Progress: {} detail pages harvested, {} tiles consumed",
                        report.processed,
                        pager.watermark()
                    );
                }
            }
        }

        Ok(())
    }
}
