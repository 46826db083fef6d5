//! Field extraction for one site layout
//!
//! Selector knowledge is isolated behind the `SiteLayout` capability trait: given
//! parsed or rendered content, it produces the optional values the crawl core needs.
//! A layout change only touches an implementation of this trait, never the pager,
//! the review paginator or the sink.

mod fields;
mod layout;

pub use fields::{collapse_whitespace, split_list};
pub use layout::TomatoLayout;

use crate::records::{CastRecord, MovieRecord, ReviewKind};
use scraper::Html;
use thiserror::Error;
use url::Url;

/// Errors that can occur while extracting fields
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Malformed content: {0}")]
    Malformed(String),
}

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Sub-fields of one rendered review row, each independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFields {
    pub posted_by: Option<String>,
    pub text: Option<String>,
    pub date_posted: Option<String>,
}

/// State of the "next page" control of a review listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Absent,
    Disabled,
    Enabled,
}

/// Review category entry points found on a detail page, as raw hrefs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewEntryPoints {
    pub critic: Option<String>,
    pub audience: Option<String>,
}

impl ReviewEntryPoints {
    pub fn get(&self, kind: ReviewKind) -> Option<&str> {
        match kind {
            ReviewKind::Critic => self.critic.as_deref(),
            ReviewKind::Audience => self.audience.as_deref(),
        }
    }
}

/// Selector knowledge for one site
pub trait SiteLayout: Send + Sync {
    /// Every currently rendered listing tile, in page order, resolved to an absolute
    /// detail URL when the tile carries or wraps a link
    fn listing_tiles(&self, html: &str, base: &Url) -> Vec<Option<String>>;

    /// CSS selector of the listing's "load more" control
    fn load_more_selector(&self) -> &str;

    /// Every currently rendered review row of the given category
    fn review_rows(&self, html: &str, kind: ReviewKind) -> Vec<ReviewFields>;

    /// Presence and visual state of the review "next page" control
    fn next_page(&self, html: &str) -> NextControl;

    /// CSS selector of the review "next page" control
    fn next_page_selector(&self) -> &str;

    /// Whether a consent overlay is currently displayed
    fn consent_overlay(&self, html: &str) -> bool;

    /// CSS selector of the control dismissing the consent overlay
    fn consent_dismiss_selector(&self) -> &str;

    /// Title of a detail page
    fn title(&self, document: &Html) -> Option<String>;

    /// Cast and crew of a detail page
    fn cast(&self, document: &Html, detail_url: &str, base: &Url)
        -> ExtractResult<Vec<CastRecord>>;

    /// Metadata of a detail page
    fn movie(&self, document: &Html) -> ExtractResult<MovieRecord>;

    /// Review category entry points of a detail page
    fn review_entry_points(&self, document: &Html) -> ReviewEntryPoints;
}
