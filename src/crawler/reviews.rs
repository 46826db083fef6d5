//! Review paginator
//!
//! Review pages need script execution, so they are walked in a secondary browsing
//! context opened for the occasion. The paginator owns that context from open to close
//! and always closes it, whatever happens inside the page loop, so the caller gets back
//! exactly the contexts it had before.

use crate::browser::{wait_until, Browser, BrowserError, BrowserResult, BrowsingContext, Readiness};
use crate::extract::{NextControl, ReviewFields, SiteLayout};
use crate::records::{ReviewKind, ReviewRecord};

/// Reviews gathered for one category
#[derive(Debug, Default)]
pub struct ReviewPages {
    pub records: Vec<ReviewRecord>,
    /// Pages read, including a page with no rows
    pub pages: u32,
    /// The error that stopped pagination early, if any
    pub interrupted: Option<BrowserError>,
}

/// Collects the reviews of one category, page by page
pub struct ReviewPaginator<'a, B, L: ?Sized> {
    browser: &'a B,
    layout: &'a L,
    readiness: Readiness,
    max_pages: u32,
}

impl<'a, B, L> ReviewPaginator<'a, B, L>
where
    B: Browser,
    L: SiteLayout + ?Sized,
{
    pub fn new(browser: &'a B, layout: &'a L, readiness: Readiness, max_pages: u32) -> Self {
        Self {
            browser,
            layout,
            readiness,
            max_pages: max_pages.max(1),
        }
    }

    /// Walks up to `max_pages` review pages starting at `entry_url`
    ///
    /// Fails only when no secondary context can be opened. Anything that goes wrong
    /// afterwards ends pagination early: the rows read so far are kept and the error is
    /// reported in `ReviewPages::interrupted`, after the context has been closed.
    pub async fn collect(
        &self,
        title: &str,
        entry_url: &str,
        kind: ReviewKind,
    ) -> BrowserResult<ReviewPages> {
        let context = self.browser.open_context().await?;

        let mut pages = ReviewPages::default();
        if let Err(e) = self.paginate(&context, title, entry_url, kind, &mut pages).await {
            pages.interrupted = Some(e);
        }

        if let Err(e) = self.browser.close_context(context).await {
            tracing::error!("Failed to close {} review context: {}", kind.label(), e);
            if pages.interrupted.is_none() {
                pages.interrupted = Some(e);
            }
        }

        Ok(pages)
    }

    async fn paginate<C>(
        &self,
        context: &C,
        title: &str,
        entry_url: &str,
        kind: ReviewKind,
        pages: &mut ReviewPages,
    ) -> BrowserResult<()>
    where
        C: BrowsingContext + ?Sized,
    {
        context.goto(entry_url).await?;
        if let Err(e) = context.stop_loading().await {
            tracing::debug!("Could not stop loading {}: {}", entry_url, e);
        }

        let layout = self.layout;
        let loaded = wait_until(context, &self.readiness, |html| {
            !layout.review_rows(html, kind).is_empty()
                || layout.next_page(html) != NextControl::Absent
        })
        .await?;
        if !loaded {
            tracing::debug!("No {} reviews rendered at {}", kind.label(), entry_url);
        }

        let mut page = 1;
        loop {
            let html = context.html().await?;
            let rows = self.layout.review_rows(&html, kind);
            pages.pages = page;
            pages
                .records
                .extend(rows.iter().cloned().map(|row| to_record(title, row, kind)));

            tracing::debug!(
                "{} reviews page {}: {} rows",
                kind.label(),
                page,
                rows.len()
            );

            if self.layout.next_page(&html) != NextControl::Enabled || page >= self.max_pages {
                break;
            }

            if self.layout.consent_overlay(&html) {
                self.dismiss_consent(context).await?;
            }

            if !context.click(self.layout.next_page_selector()).await? {
                tracing::debug!("Next control vanished on page {}", page);
                break;
            }

            let changed = wait_until(context, &self.readiness, |html| {
                layout.review_rows(html, kind) != rows
            })
            .await?;
            if !changed {
                tracing::warn!(
                    "{} reviews page {} did not change after clicking next, stopping",
                    kind.label(),
                    page
                );
                break;
            }

            page += 1;
        }

        Ok(())
    }

    async fn dismiss_consent<C>(&self, context: &C) -> BrowserResult<()>
    where
        C: BrowsingContext + ?Sized,
    {
        if context
            .click(self.layout.consent_dismiss_selector())
            .await?
        {
            let layout = self.layout;
            let gone = wait_until(context, &self.readiness, |html| !layout.consent_overlay(html))
                .await?;
            tracing::debug!("Consent overlay dismissed (gone: {})", gone);
        }
        Ok(())
    }
}

fn to_record(title: &str, row: ReviewFields, kind: ReviewKind) -> ReviewRecord {
    ReviewRecord::new(title, row.posted_by, row.text, row.date_posted, kind)
}
