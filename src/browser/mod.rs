//! Browsing context abstraction
//!
//! The listing and the review pages need script execution, so they are driven through
//! a controllable browser. This module defines the seam the crawl core talks to:
//!
//! - `Browser`: opens and closes browsing contexts (tabs)
//! - `BrowsingContext`: one tab that can navigate, expose its rendered HTML and click
//! - `wait_until`: readiness polling that replaces fixed sleeps after navigation
//!
//! `ChromeBrowser` is the production backend built on headless Chromium.

mod chrome;

pub use chrome::{ChromeBrowser, ChromeContext};

use crate::config::ReadinessConfig;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by browsing context operations
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser command failed: {0}")]
    Command(String),

    #[error("Browsing context already closed")]
    Closed,
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// One controllable tab
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Navigates to the URL and returns once the navigation is committed
    async fn goto(&self, url: &str) -> BrowserResult<()>;

    /// Returns the currently rendered document as HTML
    async fn html(&self) -> BrowserResult<String>;

    /// Clicks the first element matching the CSS selector
    ///
    /// Returns `Ok(false)` when nothing matches.
    async fn click(&self, selector: &str) -> BrowserResult<bool>;

    /// Stops any pending resource loads of the current document
    async fn stop_loading(&self) -> BrowserResult<()>;
}

/// A browser able to hand out browsing contexts
#[async_trait]
pub trait Browser: Send + Sync {
    type Context: BrowsingContext;

    /// Opens a new, blank browsing context
    async fn open_context(&self) -> BrowserResult<Self::Context>;

    /// Closes a browsing context, consuming its handle
    async fn close_context(&self, context: Self::Context) -> BrowserResult<()>;

    /// Number of browsing contexts currently open
    async fn open_context_count(&self) -> BrowserResult<usize>;
}

/// Condition polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Readiness {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

impl From<&ReadinessConfig> for Readiness {
    fn from(config: &ReadinessConfig) -> Self {
        Self::new(config.timeout(), config.poll_interval())
    }
}

/// Polls the rendered HTML of a context until `ready` holds or the timeout elapses
///
/// The predicate is evaluated at least once. Returns whether it held; a timeout is
/// not an error, callers decide how to degrade.
pub async fn wait_until<C, F>(
    context: &C,
    readiness: &Readiness,
    mut ready: F,
) -> BrowserResult<bool>
where
    C: BrowsingContext + ?Sized,
    F: FnMut(&str) -> bool,
{
    let started = Instant::now();

    loop {
        let html = context.html().await?;
        if ready(&html) {
            tracing::trace!("Readiness condition met after {:?}", started.elapsed());
            return Ok(true);
        }

        if started.elapsed() >= readiness.timeout {
            tracing::debug!(
                "Readiness condition not met within {:?}",
                readiness.timeout
            );
            return Ok(false);
        }

        tokio::time::sleep(readiness.poll_interval).await;
    }
}
