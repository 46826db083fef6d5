//! Reel-Harvest: an incremental movie-listing harvester
//!
//! This crate crawls a paginated movie listing, follows every listing tile to its
//! detail page, extracts cast, metadata and reviews, and synchronizes newly found
//! records to a remote spreadsheet and to local CSV snapshots without ever
//! re-sending a record that was already delivered.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod records;
pub mod sink;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Reel-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Remote store error: {0}")]
    Remote(#[from] sink::RemoteError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] sink::SnapshotError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Entry page {url} could not be opened: {message}")]
    EntryUnavailable { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Unresolvable link: {0}")]
    Unresolvable(String),
}

/// Result type alias for Reel-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{CastRecord, DatasetKind, MovieRecord, ReviewKind, ReviewRecord};
pub use url::{resolve_href, session_base};
