//! Remote tabular store
//!
//! The store exposes a single operation: overwrite a rectangular row range of a named
//! sub-table with the given rows. `SheetsStore` implements it on top of the Google
//! Sheets v4 `values.update` endpoint. Credentials are opaque: a bearer token is
//! handed in by the caller.
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Success |
//! | HTTP 429 | Retry with backoff |
//! | HTTP 5xx | Retry with backoff |
//! | Timeout / connection error | Retry with backoff |
//! | Other HTTP 4xx | Fail immediately |
//! | Undecodable response | Fail immediately |

use crate::config::RemoteConfig;
use crate::records::DatasetKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors returned by the remote store
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<RemoteError>,
    },
}

impl RemoteError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Transport(_) => true,
            Self::Decode(_) | Self::Endpoint(_) | Self::Exhausted { .. } => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("request timed out: {}", e))
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// A 1-indexed, inclusive row range of one sub-table, `A` through the dataset's
/// last column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet: &'static str,
    pub last_column: char,
    pub start_row: usize,
    pub end_row: usize,
}

impl SheetRange {
    /// Rows a delta occupies, given the cursor before the write
    ///
    /// Row 1 holds the headers and record `i` lives at row `i + 2`. The first write
    /// of a dataset (cursor 0) also covers the header row.
    pub fn for_delta(kind: DatasetKind, cursor: usize, delta_len: usize) -> Self {
        let start_row = if cursor == 0 { 1 } else { cursor + 2 };
        Self {
            sheet: kind.sheet_name(),
            last_column: kind.last_column(),
            start_row,
            end_row: cursor + delta_len + 1,
        }
    }

    /// Number of rows covered
    pub fn row_count(&self) -> usize {
        self.end_row + 1 - self.start_row
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!A{}:{}{}",
            self.sheet, self.start_row, self.last_column, self.end_row
        )
    }
}

/// What the store reports after an update
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: u64,
    #[serde(default)]
    pub updated_cells: u64,
}

/// A remote store addressable by sub-table and row range
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Overwrites `range` with `rows`; success means the write is confirmed
    async fn update_range(
        &self,
        range: &SheetRange,
        rows: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, RemoteError>;
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    /// A single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before attempt `attempt + 1`, given `attempt` failed (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RemoteError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    })
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Remote write attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl From<&RemoteConfig> for RetryPolicy {
    fn from(config: &RemoteConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}

/// Request body of `values.update`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

/// Google Sheets backed store
pub struct SheetsStore {
    client: Client,
    endpoint: Url,
    spreadsheet_id: String,
    token: String,
}

impl SheetsStore {
    /// Builds a store client with a bounded request timeout
    pub fn new(config: &RemoteConfig, token: String) -> Result<Self, RemoteError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| RemoteError::Endpoint(e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            spreadsheet_id: config.spreadsheet_id.clone(),
            token,
        })
    }

    fn update_url(&self, range: &SheetRange) -> Result<Url, RemoteError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Endpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range.to_string().as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        Ok(url)
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn update_range(
        &self,
        range: &SheetRange,
        rows: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, RemoteError> {
        let url = self.update_url(range)?;
        let body = ValueRange {
            range: range.to_string(),
            major_dimension: "ROWS",
            values: &rows,
        };

        tracing::debug!("Writing {} rows to {}", rows.len(), range);

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let summary: UpdateSummary = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        tracing::debug!(
            "{} cells updated, {} rows updated",
            summary.updated_cells,
            summary.updated_rows
        );

        Ok(summary)
    }
}
