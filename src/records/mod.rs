//! Record types produced by a harvest
//!
//! Three record families are extracted from every detail page:
//!
//! - `CastRecord`: one row per cast or crew member
//! - `MovieRecord`: one row per detail page
//! - `ReviewRecord`: one row per critic or audience review
//!
//! Every record renders into a flat row of text cells through the `Record` trait, which
//! is what both output sinks consume.

mod kind;

pub use kind::{DatasetKind, ReviewKind};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Sentinel written for any scalar field that could not be extracted
pub const NOT_AVAILABLE: &str = "N/A";

/// A record that can be stored in a dataset and written as a spreadsheet row
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// The dataset this record type belongs to
    const KIND: DatasetKind;

    /// Column headers, in row order
    fn headers() -> &'static [&'static str];

    /// Renders the record as one row of cells
    fn to_row(&self) -> Vec<String>;
}

/// One cast or crew entry of a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRecord {
    pub detail_url: String,
    pub profile_url: String,
    pub name: String,
    pub role: String,
}

impl CastRecord {
    /// Builds a cast record, substituting the sentinel for absent values
    pub fn new(
        detail_url: impl Into<String>,
        profile_url: Option<String>,
        name: Option<String>,
        role: Option<String>,
    ) -> Self {
        Self {
            detail_url: detail_url.into(),
            profile_url: or_sentinel(profile_url),
            name: or_sentinel(name),
            role: or_sentinel(role),
        }
    }
}

impl Record for CastRecord {
    const KIND: DatasetKind = DatasetKind::Cast;

    fn headers() -> &'static [&'static str] {
        &["movie_url", "actor_profile_url", "name", "role"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.detail_url.clone(),
            self.profile_url.clone(),
            self.name.clone(),
            self.role.clone(),
        ]
    }
}

/// Metadata of one detail page
///
/// Scalar fields hold `N/A` when absent; list fields are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    pub genre: Vec<String>,
    pub thumbnail_url: String,
    pub synopsis: String,
    pub rating: String,
    pub audience_score: String,
    pub tomatometer_score: String,
    pub language: String,
    pub director: Vec<String>,
    pub writer: Vec<String>,
    pub producer: Vec<String>,
    pub theater_release_date: String,
    pub streaming_release_date: String,
    pub usa_box_office_gross: String,
    pub runtime: String,
    pub distributor: String,
    pub production_company: Vec<String>,
    pub sound_mix: Vec<String>,
}

impl MovieRecord {
    /// A record where every field carries its default, except the title
    pub fn untitled() -> Self {
        Self::with_title(NOT_AVAILABLE)
    }

    /// A record where every field carries its default
    pub fn with_title(title: impl Into<String>) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            title: title.into(),
            genre: Vec::new(),
            thumbnail_url: na(),
            synopsis: na(),
            rating: na(),
            audience_score: na(),
            tomatometer_score: na(),
            language: na(),
            director: Vec::new(),
            writer: Vec::new(),
            producer: Vec::new(),
            theater_release_date: na(),
            streaming_release_date: na(),
            usa_box_office_gross: na(),
            runtime: na(),
            distributor: na(),
            production_company: Vec::new(),
            sound_mix: Vec::new(),
        }
    }
}

impl Record for MovieRecord {
    const KIND: DatasetKind = DatasetKind::Movies;

    fn headers() -> &'static [&'static str] {
        &[
            "title",
            "genre",
            "thumbnail_url",
            "synopsis",
            "rating",
            "audience_score",
            "tomatometer_score",
            "language",
            "director",
            "writer",
            "producer",
            "theater_release_date",
            "streaming_release_date",
            "usa_box_office_gross",
            "runtime",
            "distributor",
            "production_company",
            "soundmix",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            list_cell(&self.genre),
            self.thumbnail_url.clone(),
            self.synopsis.clone(),
            self.rating.clone(),
            self.audience_score.clone(),
            self.tomatometer_score.clone(),
            self.language.clone(),
            list_cell(&self.director),
            list_cell(&self.writer),
            list_cell(&self.producer),
            self.theater_release_date.clone(),
            self.streaming_release_date.clone(),
            self.usa_box_office_gross.clone(),
            self.runtime.clone(),
            self.distributor.clone(),
            list_cell(&self.production_company),
            list_cell(&self.sound_mix),
        ]
    }
}

/// One review row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub movie_title: String,
    pub posted_by: String,
    pub text: String,
    pub date_posted: String,
    pub kind: ReviewKind,
}

impl ReviewRecord {
    /// Builds a review, defaulting each missing sub-field independently
    pub fn new(
        movie_title: impl Into<String>,
        posted_by: Option<String>,
        text: Option<String>,
        date_posted: Option<String>,
        kind: ReviewKind,
    ) -> Self {
        Self {
            movie_title: movie_title.into(),
            posted_by: or_sentinel(posted_by),
            text: or_sentinel(text),
            date_posted: or_sentinel(date_posted),
            kind,
        }
    }
}

impl Record for ReviewRecord {
    const KIND: DatasetKind = DatasetKind::Reviews;

    fn headers() -> &'static [&'static str] {
        &["movie", "posted_by", "text", "date_posted", "review_type"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.movie_title.clone(),
            self.posted_by.clone(),
            self.text.clone(),
            self.date_posted.clone(),
            self.kind.as_str().to_string(),
        ]
    }
}

/// Everything harvested from a single detail page
#[derive(Debug, Clone, Default)]
pub struct DetailBatch {
    pub cast: Vec<CastRecord>,
    /// `None` only when the detail page itself could not be fetched
    pub movie: Option<MovieRecord>,
    pub reviews: Vec<ReviewRecord>,
}

impl DetailBatch {
    pub fn is_empty(&self) -> bool {
        self.cast.is_empty() && self.movie.is_none() && self.reviews.is_empty()
    }
}

fn or_sentinel(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn list_cell(values: &[String]) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(",")
    }
}
