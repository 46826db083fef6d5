//! Detail crawler
//!
//! Turns one listing identifier into a `DetailBatch`. Nothing in here aborts the
//! identifier: extraction failures degrade to defaults and review failures degrade to
//! whatever rows were read.

use crate::browser::Browser;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::reviews::ReviewPaginator;
use crate::extract::{ReviewEntryPoints, SiteLayout};
use crate::records::{CastRecord, DetailBatch, MovieRecord, ReviewKind, ReviewRecord};
use crate::url::resolve_href;
use reqwest::Client;
use scraper::Html;
use url::Url;

/// Everything read from the static detail markup
struct ParsedDetail {
    cast: Vec<CastRecord>,
    movie: MovieRecord,
    entry_points: ReviewEntryPoints,
}

/// Processes one detail page at a time
pub struct DetailCrawler<'a, B, L: ?Sized> {
    client: &'a Client,
    layout: &'a L,
    base: &'a Url,
    reviews: ReviewPaginator<'a, B, L>,
}

impl<'a, B, L> DetailCrawler<'a, B, L>
where
    B: Browser,
    L: SiteLayout + ?Sized,
{
    pub fn new(
        client: &'a Client,
        layout: &'a L,
        base: &'a Url,
        reviews: ReviewPaginator<'a, B, L>,
    ) -> Self {
        Self {
            client,
            layout,
            base,
            reviews,
        }
    }

    /// Harvests one detail page
    ///
    /// When the page itself cannot be fetched the batch is empty and has no movie;
    /// otherwise it always carries a movie record.
    pub async fn process(&self, identifier: &str) -> DetailBatch {
        let body = match fetch_page(self.client, identifier).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", identifier, e);
                return DetailBatch::default();
            }
        };

        let parsed = self.parse(identifier, &body);
        tracing::info!(
            "{}: '{}' with {} cast entries",
            identifier,
            parsed.movie.title,
            parsed.cast.len()
        );

        let mut reviews = Vec::new();
        for kind in [ReviewKind::Critic, ReviewKind::Audience] {
            reviews.extend(
                self.collect_reviews(&parsed.movie.title, &parsed.entry_points, kind)
                    .await,
            );
        }

        DetailBatch {
            cast: parsed.cast,
            movie: Some(parsed.movie),
            reviews,
        }
    }

    fn parse(&self, identifier: &str, body: &str) -> ParsedDetail {
        let document = Html::parse_document(body);

        let cast = self
            .layout
            .cast(&document, identifier, self.base)
            .unwrap_or_else(|e| {
                tracing::warn!("Cast extraction failed for {}: {}", identifier, e);
                Vec::new()
            });

        let movie = self.layout.movie(&document).unwrap_or_else(|e| {
            tracing::warn!("Metadata extraction failed for {}: {}", identifier, e);
            self.layout
                .title(&document)
                .map(MovieRecord::with_title)
                .unwrap_or_else(MovieRecord::untitled)
        });

        ParsedDetail {
            cast,
            movie,
            entry_points: self.layout.review_entry_points(&document),
        }
    }

    async fn collect_reviews(
        &self,
        title: &str,
        entry_points: &ReviewEntryPoints,
        kind: ReviewKind,
    ) -> Vec<ReviewRecord> {
        let Some(href) = entry_points.get(kind) else {
            tracing::info!("'{}' has no {} reviews", title, kind.label());
            return Vec::new();
        };
        let Some(entry_url) = resolve_href(self.base, href) else {
            tracing::warn!("Unresolvable {} review link '{}'", kind.label(), href);
            return Vec::new();
        };

        match self.reviews.collect(title, &entry_url, kind).await {
            Ok(pages) => {
                if let Some(e) = &pages.interrupted {
                    tracing::warn!(
                        "{} reviews of '{}' stopped after page {}: {}",
                        kind.label(),
                        title,
                        pages.pages,
                        e
                    );
                }
                tracing::info!(
                    "'{}': {} {} reviews over {} pages",
                    title,
                    pages.records.len(),
                    kind.label(),
                    pages.pages
                );
                pages.records
            }
            Err(e) => {
                tracing::warn!(
                    "Could not open a context for {} reviews of '{}': {}",
                    kind.label(),
                    title,
                    e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserError, BrowserResult, BrowsingContext, Readiness};
    use crate::extract::{ExtractError, ExtractResult, NextControl, ReviewFields, TomatoLayout};
    use crate::records::NOT_AVAILABLE;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Layout whose cast and metadata extraction always fail
    struct BrokenLayout {
        inner: TomatoLayout,
    }

    impl SiteLayout for BrokenLayout {
        fn listing_tiles(&self, html: &str, base: &Url) -> Vec<Option<String>> {
            self.inner.listing_tiles(html, base)
        }

        fn load_more_selector(&self) -> &str {
            self.inner.load_more_selector()
        }

        fn review_rows(&self, html: &str, kind: ReviewKind) -> Vec<ReviewFields> {
            self.inner.review_rows(html, kind)
        }

        fn next_page(&self, html: &str) -> NextControl {
            self.inner.next_page(html)
        }

        fn next_page_selector(&self) -> &str {
            self.inner.next_page_selector()
        }

        fn consent_overlay(&self, html: &str) -> bool {
            self.inner.consent_overlay(html)
        }

        fn consent_dismiss_selector(&self) -> &str {
            self.inner.consent_dismiss_selector()
        }

        fn title(&self, document: &Html) -> Option<String> {
            self.inner.title(document)
        }

        fn cast(
            &self,
            _document: &Html,
            _detail_url: &str,
            _base: &Url,
        ) -> ExtractResult<Vec<CastRecord>> {
            Err(ExtractError::Malformed("cast block truncated".to_string()))
        }

        fn movie(&self, _document: &Html) -> ExtractResult<MovieRecord> {
            Err(ExtractError::Malformed("info list truncated".to_string()))
        }

        fn review_entry_points(&self, document: &Html) -> ReviewEntryPoints {
            self.inner.review_entry_points(document)
        }
    }

    /// Browser that cannot open any context
    #[derive(Default)]
    struct NoTabs {
        attempts: AtomicUsize,
    }

    struct NeverTab;

    #[async_trait]
    impl BrowsingContext for NeverTab {
        async fn goto(&self, _url: &str) -> BrowserResult<()> {
            Ok(())
        }

        async fn html(&self) -> BrowserResult<String> {
            Ok(String::new())
        }

        async fn click(&self, _selector: &str) -> BrowserResult<bool> {
            Ok(false)
        }

        async fn stop_loading(&self) -> BrowserResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Browser for NoTabs {
        type Context = NeverTab;

        async fn open_context(&self) -> BrowserResult<NeverTab> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(BrowserError::Command("tab limit reached".to_string()))
        }

        async fn close_context(&self, _context: NeverTab) -> BrowserResult<()> {
            Ok(())
        }

        async fn open_context_count(&self) -> BrowserResult<usize> {
            Ok(1)
        }
    }

    async fn serve(server: &MockServer, route: &str, body: &str) -> String {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
            .mount(server)
            .await;
        format!("{}{}", server.uri(), route)
    }

    fn readiness() -> Readiness {
        Readiness::new(Duration::from_millis(20), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_extraction_failures_degrade_to_defaults() {
        let server = MockServer::start().await;
        let url = serve(
            &server,
            "/m/broken",
            "<html><body><h1 data-qa='score-panel-title'>Broken Film</h1>\
             <div class='cast-wrap'><div class='cast-item'><img alt='Ada Lane'>\
             <div class='metadata'></div></div></div></body></html>",
        )
        .await;

        let client = Client::new();
        let layout = BrokenLayout {
            inner: TomatoLayout::new(),
        };
        let base = Url::parse(&server.uri()).unwrap();
        let browser = NoTabs::default();
        let reviews = ReviewPaginator::new(&browser, &layout, readiness(), 10);
        let crawler = DetailCrawler::new(&client, &layout, &base, reviews);

        let batch = crawler.process(&url).await;

        assert!(batch.cast.is_empty());
        let movie = batch.movie.unwrap();
        assert_eq!(movie, MovieRecord::with_title("Broken Film"));
        assert_eq!(movie.synopsis, NOT_AVAILABLE);
        assert_eq!(movie.runtime, NOT_AVAILABLE);
        assert!(movie.genre.is_empty());
        assert!(batch.reviews.is_empty());
    }

    #[tokio::test]
    async fn test_missing_title_falls_back_to_untitled() {
        let server = MockServer::start().await;
        let url = serve(&server, "/m/blank", "<html><body><p>Nothing</p></body></html>").await;

        let client = Client::new();
        let layout = BrokenLayout {
            inner: TomatoLayout::new(),
        };
        let base = Url::parse(&server.uri()).unwrap();
        let browser = NoTabs::default();
        let reviews = ReviewPaginator::new(&browser, &layout, readiness(), 10);
        let crawler = DetailCrawler::new(&client, &layout, &base, reviews);

        let batch = crawler.process(&url).await;

        assert_eq!(batch.movie, Some(MovieRecord::untitled()));
        assert_eq!(browser.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_review_context_failure_keeps_the_detail() {
        let server = MockServer::start().await;
        let url = serve(
            &server,
            "/m/film",
            "<html><body><h1 data-qa='score-panel-title'>Film</h1>\
             <a data-qa='tomatometer-review-count' href='/m/film/reviews'>Reviews</a>\
             <a data-qa='audience-rating-count' href='/m/film/reviews?type=user'>Ratings</a>\
             </body></html>",
        )
        .await;

        let client = Client::new();
        let layout = TomatoLayout::new();
        let base = Url::parse(&server.uri()).unwrap();
        let browser = NoTabs::default();
        let reviews = ReviewPaginator::new(&browser, &layout, readiness(), 10);
        let crawler = DetailCrawler::new(&client, &layout, &base, reviews);

        let batch = crawler.process(&url).await;

        assert_eq!(batch.movie.unwrap().title, "Film");
        assert!(batch.reviews.is_empty());
        // both categories were attempted independently
        assert_eq!(browser.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unfetchable_page_yields_no_movie() {
        let server = MockServer::start().await;
        let url = format!("{}/m/missing", server.uri());

        let client = Client::new();
        let layout = TomatoLayout::new();
        let base = Url::parse(&server.uri()).unwrap();
        let browser = NoTabs::default();
        let reviews = ReviewPaginator::new(&browser, &layout, readiness(), 10);
        let crawler = DetailCrawler::new(&client, &layout, &base, reviews);

        let batch = crawler.process(&url).await;

        assert!(batch.movie.is_none());
        assert!(batch.cast.is_empty());
    }
}
