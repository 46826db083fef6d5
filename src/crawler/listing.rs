//! Listing pager
//!
//! The listing grows in place: every "load more" click appends tiles at the end of the
//! page. The pager keeps a watermark (the tile count already consumed) and only ever
//! reads the tail past it, so identifiers come out in page order, each exactly once,
//! however many tiles a round happens to append.

use crate::browser::{wait_until, BrowserResult, BrowsingContext, Readiness};
use crate::extract::SiteLayout;
use crate::url::canonical_identifier;
use std::collections::HashSet;
use url::Url;

/// Drives the "load more" loop of one listing page
pub struct ListingPager<'a, L: ?Sized> {
    layout: &'a L,
    base: Url,
    readiness: Readiness,
    max_stalled_rounds: u32,
    watermark: usize,
    stalled_rounds: u32,
    rounds: u32,
    exhausted: bool,
    seen: HashSet<String>,
}

impl<'a, L: SiteLayout + ?Sized> ListingPager<'a, L> {
    /// Creates a pager for a listing already loaded in the context
    pub fn new(layout: &'a L, base: Url, readiness: Readiness, max_stalled_rounds: u32) -> Self {
        Self {
            layout,
            base,
            readiness,
            max_stalled_rounds: max_stalled_rounds.max(1),
            watermark: 0,
            stalled_rounds: 0,
            rounds: 0,
            exhausted: false,
            seen: HashSet::new(),
        }
    }

    /// Number of tiles consumed so far
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Yields the identifiers appended since the previous batch
    ///
    /// The first call reads the tiles already rendered; every later call triggers
    /// "load more" first. Returns `None` once the control is gone, or after too many
    /// consecutive rounds that appended nothing. A batch may be empty when a round
    /// stalled or only produced duplicates.
    pub async fn next_batch<C>(&mut self, context: &C) -> BrowserResult<Option<Vec<String>>>
    where
        C: BrowsingContext + ?Sized,
    {
        if self.exhausted {
            return Ok(None);
        }

        if self.rounds > 0 && !context.click(self.layout.load_more_selector()).await? {
            tracing::info!(
                "No load-more control after {} rounds, {} tiles consumed",
                self.rounds,
                self.watermark
            );
            self.exhausted = true;
            return Ok(None);
        }
        self.rounds += 1;

        let watermark = self.watermark;
        let layout = self.layout;
        let base = &self.base;
        let grew = wait_until(context, &self.readiness, |html| {
            layout.listing_tiles(html, base).len() > watermark
        })
        .await?;

        let html = context.html().await?;
        let tiles = self.layout.listing_tiles(&html, &self.base);
        let observed = tiles.len();

        if !grew && observed <= watermark {
            self.stalled_rounds += 1;
            tracing::warn!(
                "Listing round {} appended no tiles ({}/{} stalled rounds)",
                self.rounds,
                self.stalled_rounds,
                self.max_stalled_rounds
            );
            if self.stalled_rounds >= self.max_stalled_rounds {
                self.exhausted = true;
                return Ok(None);
            }
            return Ok(Some(Vec::new()));
        }
        self.stalled_rounds = 0;

        let batch = self.take_tail(tiles);
        self.watermark = self.watermark.max(observed);

        tracing::debug!(
            "Listing round {}: {} tiles rendered, {} new identifiers",
            self.rounds,
            observed,
            batch.len()
        );

        Ok(Some(batch))
    }

    fn take_tail(&mut self, tiles: Vec<Option<String>>) -> Vec<String> {
        let mut batch = Vec::new();

        for (index, tile) in tiles.into_iter().enumerate().skip(self.watermark) {
            let Some(href) = tile else {
                tracing::warn!("Listing tile {} has no resolvable link, skipping", index);
                continue;
            };

            match canonical_identifier(&href) {
                Ok(identifier) => {
                    if self.seen.insert(identifier.clone()) {
                        batch.push(identifier);
                    } else {
                        tracing::debug!("Duplicate listing tile {} ({})", index, identifier);
                    }
                }
                Err(e) => tracing::warn!("Listing tile {} link {} rejected: {}", index, href, e),
            }
        }

        batch
    }
}
