//! HTTP fetcher for detail pages
//!
//! Detail markup is static, so it is fetched with a plain HTTP client rather than
//! through the browser. This module handles:
//! - Building the HTTP client with the configured user agent and timeout
//! - GET requests for detail pages
//! - Error classification

use crate::config::CrawlerConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("Unexpected content type '{content_type}' from {url}")]
    ContentMismatch { url: String, content_type: String },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use reel_harvest::config::CrawlerConfig;
/// use reel_harvest::crawler::build_http_client;
///
/// let config = CrawlerConfig {
///     entry_url: "https://www.rottentomatoes.com/browse/movies_at_home".to_string(),
///     max_review_pages: 10,
///     max_detail_pages: None,
///     max_stalled_rounds: 3,
///     user_agent: "ReelHarvest/1.0".to_string(),
///     request_timeout_secs: 30,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a detail page and returns its body
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML or no content type | body |
/// | 2xx with another content type | `ContentMismatch` |
/// | any other status | `Http` |
/// | timeout | `Timeout` |
/// | connection refused / TLS failure | `Connect` |
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.contains("html") {
        return Err(FetchError::ContentMismatch {
            url: url.to_string(),
            content_type,
        });
    }

    response.text().await.map_err(|e| classify(url, e))
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
