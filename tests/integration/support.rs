//! Shared fixtures: a scripted browser, an in-memory tabular store and page builders

use async_trait::async_trait;
use reel_harvest::browser::{Browser, BrowserError, BrowserResult, BrowsingContext};
use reel_harvest::config::{
    BrowserConfig, Config, CrawlerConfig, OutputConfig, ReadinessConfig, RemoteConfig,
};
use reel_harvest::sink::{RemoteError, SheetRange, TabularStore, UpdateSummary};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use url::Url;

pub const LISTING_PATH: &str = "/browse/movies_at_home";
const LOAD_MORE: &str = "button[data-qa='dlp-load-more-button']";

#[derive(Default)]
struct SiteState {
    tiles: Vec<String>,
    rounds: VecDeque<Vec<String>>,
    reviews: HashMap<String, Vec<String>>,
    fail_entry: bool,
    open: usize,
    max_open: usize,
    opened_total: usize,
}

#[derive(Debug, Clone)]
enum Location {
    Blank,
    Listing,
    Reviews { key: String, page: usize },
}

/// Browser serving the listing and review pages from a script
#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    state: Arc<Mutex<SiteState>>,
}

pub struct ScriptedTab {
    state: Arc<Mutex<SiteState>>,
    location: Mutex<Location>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tiles rendered when the listing first loads
    pub fn with_tiles(self, hrefs: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .tiles
            .extend(hrefs.iter().map(|h| h.to_string()));
        self
    }

    /// Tiles appended by one "load more" click
    pub fn with_round(self, hrefs: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .rounds
            .push_back(hrefs.iter().map(|h| h.to_string()).collect());
        self
    }

    /// Review pages served at `path_and_query`, in pagination order
    pub fn with_reviews(self, path_and_query: &str, pages: Vec<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .reviews
            .insert(path_and_query.to_string(), pages);
        self
    }

    pub fn failing_entry(self) -> Self {
        self.state.lock().unwrap().fail_entry = true;
        self
    }

    pub fn max_open(&self) -> usize {
        self.state.lock().unwrap().max_open
    }

    pub fn opened_total(&self) -> usize {
        self.state.lock().unwrap().opened_total
    }

    pub fn open_now(&self) -> usize {
        self.state.lock().unwrap().open
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    type Context = ScriptedTab;

    async fn open_context(&self) -> BrowserResult<ScriptedTab> {
        let mut state = self.state.lock().unwrap();
        state.open += 1;
        state.opened_total += 1;
        state.max_open = state.max_open.max(state.open);
        Ok(ScriptedTab {
            state: Arc::clone(&self.state),
            location: Mutex::new(Location::Blank),
        })
    }

    async fn close_context(&self, _context: ScriptedTab) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.open == 0 {
            return Err(BrowserError::Closed);
        }
        state.open -= 1;
        Ok(())
    }

    async fn open_context_count(&self) -> BrowserResult<usize> {
        Ok(self.state.lock().unwrap().open)
    }
}

fn path_and_query(url: &str) -> BrowserResult<String> {
    let parsed = Url::parse(url).map_err(|e| BrowserError::Navigation {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    })
}

#[async_trait]
impl BrowsingContext for ScriptedTab {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        let key = path_and_query(url)?;
        let state = self.state.lock().unwrap();
        let location = if key == LISTING_PATH {
            if state.fail_entry {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_CONNECTION_RESET".to_string(),
                });
            }
            Location::Listing
        } else if state.reviews.contains_key(&key) {
            Location::Reviews { key, page: 0 }
        } else {
            Location::Blank
        };
        *self.location.lock().unwrap() = location;
        Ok(())
    }

    async fn html(&self) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        let location = self.location.lock().unwrap().clone();
        let html = match location {
            Location::Blank => "<html><body></body></html>".to_string(),
            Location::Listing => {
                let mut html = String::from("<html><body><div class='grid'>");
                for href in &state.tiles {
                    html.push_str(&format!(
                        "<div class='js-tile-link'><a href='{}'>Film</a></div>",
                        href
                    ));
                }
                html.push_str("</div>");
                if !state.rounds.is_empty() {
                    html.push_str("<button data-qa='dlp-load-more-button'>Load more</button>");
                }
                html.push_str("</body></html>");
                html
            }
            Location::Reviews { key, page } => state
                .reviews
                .get(&key)
                .and_then(|pages| pages.get(page))
                .cloned()
                .unwrap_or_default(),
        };
        Ok(html)
    }

    async fn click(&self, selector: &str) -> BrowserResult<bool> {
        let mut state = self.state.lock().unwrap();
        let mut location = self.location.lock().unwrap();
        match &mut *location {
            Location::Listing if selector == LOAD_MORE => match state.rounds.pop_front() {
                Some(round) => {
                    state.tiles.extend(round);
                    Ok(true)
                }
                None => Ok(false),
            },
            Location::Reviews { key, page } if selector == ".next" => {
                let count = state.reviews.get(key.as_str()).map_or(0, Vec::len);
                if *page + 1 < count {
                    *page += 1;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn stop_loading(&self) -> BrowserResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    writes: Vec<(String, Vec<Vec<String>>)>,
    failures_left: u32,
}

/// Tabular store keeping confirmed writes in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// A store rejecting its first `times` writes with a 503
    pub fn failing(times: u32) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().failures_left = times;
        store
    }

    /// Confirmed writes as (range, rows)
    pub fn writes(&self) -> Vec<(String, Vec<Vec<String>>)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Ranges of confirmed writes to one sub-table
    pub fn ranges(&self, sheet: &str) -> Vec<String> {
        self.writes()
            .into_iter()
            .map(|(range, _)| range)
            .filter(|range| range.starts_with(&format!("{}!", sheet)))
            .collect()
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn update_range(
        &self,
        range: &SheetRange,
        rows: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(RemoteError::Http {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        let updated_rows = rows.len() as u64;
        state.writes.push((range.to_string(), rows));
        Ok(UpdateSummary {
            updated_range: Some(range.to_string()),
            updated_rows,
            updated_cells: 0,
        })
    }
}

pub fn test_config(server_uri: &str, snapshot_dir: &str, journal_path: Option<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            entry_url: format!("{}{}", server_uri, LISTING_PATH),
            max_review_pages: 10,
            max_detail_pages: None,
            max_stalled_rounds: 2,
            user_agent: "ReelHarvestTest/1.0".to_string(),
            request_timeout_secs: 5,
        },
        readiness: ReadinessConfig {
            timeout_ms: 100,
            poll_interval_ms: 2,
        },
        browser: BrowserConfig::default(),
        remote: RemoteConfig {
            spreadsheet_id: "sheet-1".to_string(),
            endpoint: server_uri.to_string(),
            token_env: "REEL_HARVEST_TEST_TOKEN".to_string(),
            timeout_secs: 5,
            max_attempts: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        },
        output: OutputConfig {
            snapshot_dir: snapshot_dir.to_string(),
            journal_path,
        },
    }
}

/// A detail page with the given review entry points and cast names
pub fn detail_page(
    title: &str,
    critic_href: Option<&str>,
    audience_href: Option<&str>,
    cast: &[&str],
) -> String {
    let mut html = format!(
        "<html><body><h1 data-qa='score-panel-title'>{}</h1>\
         <score-board id='scoreboard' audiencescore='80' tomatometerscore='90'></score-board>\
         <ul><li class='info-item'><p><b>Genre:</b><span>Drama, Comedy</span></p></li>\
         <li class='info-item'><p><b>Runtime:</b><span>1h 40m</span></p></li></ul>",
        title
    );
    if let Some(href) = critic_href {
        html.push_str(&format!(
            "<a data-qa='tomatometer-review-count' href='{}'>Reviews</a>",
            href
        ));
    }
    if let Some(href) = audience_href {
        html.push_str(&format!(
            "<a data-qa='audience-rating-count' href='{}'>Ratings</a>",
            href
        ));
    }
    html.push_str("<div class='cast-wrap'>");
    for name in cast {
        html.push_str(&format!(
            "<div class='cast-item'><a href='/celebrity/{}'><img alt='{}'></a>\
             <div class='metadata'><p class='p--small'>Role of {}</p></div></div>",
            name.to_lowercase().replace(' ', "_"),
            name,
            name
        ));
    }
    html.push_str("</div></body></html>");
    html
}

/// One page of critic reviews; `next` is the class list of the next control, if any
pub fn critic_page(prefix: &str, rows: usize, next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..rows {
        html.push_str(&format!(
            "<div class='review-row'><a class='display-name'>{} critic {}</a>\
             <p class='review-text'>{} text {}</p>\
             <span data-qa='review-date'>Jan {}, 2024</span></div>",
            prefix,
            i,
            prefix,
            i,
            i + 1
        ));
    }
    if let Some(class) = next {
        html.push_str(&format!("<a class='{}'>Next</a>", class));
    }
    html.push_str("</body></html>");
    html
}

/// One page of audience reviews without a next control
pub fn audience_page(prefix: &str, rows: usize) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..rows {
        html.push_str(&format!(
            "<div class='audience-review-row'><span class='audience-reviews__name'>{} fan {}</span>\
             <p data-qa='review-text'>{} opinion {}</p>\
             <span class='audience-reviews__duration'>{}d</span></div>",
            prefix, i, prefix, i, i
        ));
    }
    html.push_str("</body></html>");
    html
}
