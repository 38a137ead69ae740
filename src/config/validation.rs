//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, delays ordered, page size > 0)
//! - Keep the upload concurrency bound below the platform quota
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is handed to the executor

use std::fmt;

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every issue found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) => {
            let https = url.scheme() == "https";
            let http_allowed = config.api.allow_http && url.scheme() == "http";
            if !https && !http_allowed {
                issues.push(ConfigIssue::new("api.base_url", "base URL must be https"));
            }
            if !url.path().ends_with('/') {
                issues.push(ConfigIssue::new("api.base_url", "base URL must end with '/'"));
            }
        }
        Err(e) => issues.push(ConfigIssue::new("api.base_url", format!("invalid URL: {e}"))),
    }

    if config.api.token.is_some() && config.api.authorization_header().is_none() {
        issues.push(ConfigIssue::new("api.token", "invalid token format"));
    }

    if config.api.timeout_secs == 0 {
        issues.push(ConfigIssue::new("api.timeout_secs", "must be greater than zero"));
    }

    if !(400..500).contains(&config.api.quota_status) {
        issues.push(ConfigIssue::new("api.quota_status", "must be a 4xx status"));
    }

    if config.retries.max_attempts == 0 {
        issues.push(ConfigIssue::new("retries.max_attempts", "must be at least 1"));
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        issues.push(ConfigIssue::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.uploads.concurrency_bound == 0 {
        issues.push(ConfigIssue::new("uploads.concurrency_bound", "must be at least 1"));
    } else if config.uploads.concurrency_bound >= config.uploads.unprocessed_upload_quota {
        issues.push(ConfigIssue::new(
            "uploads.concurrency_bound",
            format!(
                "must stay below the unprocessed upload quota ({})",
                config.uploads.unprocessed_upload_quota
            ),
        ));
    }

    if config.uploads.chunk_size_bytes == 0 {
        issues.push(ConfigIssue::new("uploads.chunk_size_bytes", "must be greater than zero"));
    }

    if config.pagination.page_size == 0 {
        issues.push(ConfigIssue::new("pagination.page_size", "must be greater than zero"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
