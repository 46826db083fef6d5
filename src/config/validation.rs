use crate::config::types::{Config, CrawlerConfig, OutputConfig, ReadinessConfig, RemoteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_readiness_config(&config.readiness)?;
    validate_remote_config(&config.remote)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.entry_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid entry-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "entry-url '{}' must use HTTP or HTTPS",
            config.entry_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "entry-url '{}' has no host",
            config.entry_url
        )));
    }

    if config.max_review_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-review-pages must be >= 1, got {}",
            config.max_review_pages
        )));
    }

    if config.max_stalled_rounds < 1 {
        return Err(ConfigError::Validation(format!(
            "max-stalled-rounds must be >= 1, got {}",
            config.max_stalled_rounds
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates readiness polling configuration
fn validate_readiness_config(config: &ReadinessConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be > 0".to_string(),
        ));
    }

    if config.timeout_ms < config.poll_interval_ms {
        return Err(ConfigError::Validation(format!(
            "timeout-ms ({}) must be >= poll-interval-ms ({})",
            config.timeout_ms, config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates remote store configuration
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    if config.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "spreadsheet-id cannot be empty".to_string(),
        ));
    }

    if config.token_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "token-env cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid remote endpoint: {}", e)))?;

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "remote timeout-secs must be > 0".to_string(),
        ));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial-backoff-ms ({}) must be <= max-backoff-ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.snapshot_dir.is_empty() {
        return Err(ConfigError::Validation(
            "snapshot-dir cannot be empty".to_string(),
        ));
    }

    if matches!(config.journal_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "journal-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
