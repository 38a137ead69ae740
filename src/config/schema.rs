//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the transfer client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Platform endpoint and credentials.
    pub api: ApiConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Upload concurrency and chunking.
    pub uploads: UploadConfig,

    /// List endpoint paging.
    pub pagination: PaginationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Platform endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root, every request path is joined onto it.
    pub base_url: String,

    /// API token, either bare or prefixed with a scheme word ("Bearer abc").
    /// Falls back to `GRAND_CHALLENGE_AUTHORIZATION` when unset.
    pub token: Option<String>,

    /// Per-attempt request timeout in seconds.
    pub timeout_secs: u64,

    /// HTTP status the platform uses to signal quota or rate limiting.
    pub quota_status: u16,

    /// Permit plain http base URLs (local test servers only).
    pub allow_http: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://grand-challenge.org/api/v1/".to_string(),
            token: None,
            timeout_secs: 60,
            quota_status: 429,
            allow_http: false,
        }
    }
}

impl ApiConfig {
    /// Build the `Authorization` header value from the configured token.
    ///
    /// Repeated spaces are collapsed; the last word is taken as the token.
    pub fn authorization_header(&self) -> Option<String> {
        let token = self.token.as_deref()?;
        let parts: Vec<&str> = token.split_whitespace().collect();
        match parts.as_slice() {
            [token] | [_, token] => Some(format!("BEARER {token}")),
            _ => None,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Fixed wait after a quota rejection in seconds. Unset means the
    /// exponential schedule also applies to quota rejections.
    pub quota_delay_secs: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 8,
            base_delay_ms: 500,
            max_delay_ms: 60_000,
            quota_delay_secs: None,
        }
    }
}

/// Upload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum number of upload sessions running at once.
    pub concurrency_bound: usize,

    /// Platform limit on unprocessed uploads per user. The concurrency
    /// bound must stay below it.
    pub unprocessed_upload_quota: usize,

    /// Size of each transferred part in bytes.
    pub chunk_size_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency_bound: 4,
            unprocessed_upload_quota: 10,
            chunk_size_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Pagination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Records requested per page.
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
