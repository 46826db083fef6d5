use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Reel-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub remote: RemoteConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Listing page the crawl starts from
    #[serde(rename = "entry-url")]
    pub entry_url: String,

    /// Maximum number of review pages read per review category
    #[serde(rename = "max-review-pages", default = "default_max_review_pages")]
    pub max_review_pages: u32,

    /// Stop after this many detail pages (unbounded when absent)
    #[serde(rename = "max-detail-pages", default)]
    pub max_detail_pages: Option<u32>,

    /// Consecutive "load more" rounds that may append nothing before the listing is
    /// considered exhausted
    #[serde(rename = "max-stalled-rounds", default = "default_max_stalled_rounds")]
    pub max_stalled_rounds: u32,

    /// User agent sent with static detail page fetches
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single detail page fetch (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Condition polling used in place of fixed sleeps after navigation
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    /// Upper bound on how long a readiness condition is polled (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_readiness_timeout")]
    pub timeout_ms: u64,

    /// Delay between two polls (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_readiness_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chromium binary; auto-detected when absent
    #[serde(default)]
    pub executable: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

/// Remote spreadsheet configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(rename = "spreadsheet-id")]
    pub spreadsheet_id: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the bearer token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    #[serde(rename = "timeout-secs", default = "default_remote_timeout")]
    pub timeout_secs: u64,

    /// Attempts per remote write, the first one included
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(rename = "max-backoff-ms", default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the CSV snapshots
    #[serde(rename = "snapshot-dir")]
    pub snapshot_dir: String,

    /// SQLite journal making cursors survive restarts
    #[serde(rename = "journal-path", default)]
    pub journal_path: Option<String>,
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_max_review_pages() -> u32 {
    10
}

fn default_max_stalled_rounds() -> u32 {
    3
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:98.0) Gecko/20100101 Firefox/98.0".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_readiness_timeout() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_token_env() -> String {
    "SHEETS_ACCESS_TOKEN".to_string()
}

fn default_remote_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    8_000
}
