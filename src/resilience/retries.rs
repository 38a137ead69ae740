//! Retry strategies.
//!
//! # Responsibilities
//! - Decide, per failed attempt, whether to stop or wait and try again
//! - Classify failures (transport, 5xx and quota are retryable)
//! - Parse server-directed `Retry-After` delays
//!
//! # Design Decisions
//! - Strategies are pure: no sleeping, no I/O, no shared mutable state
//! - Connection failures are treated like 5xx
//! - A `Retry-After` value replaces the computed delay but never turns a
//!   `Stop` into a retry; the strategy still owns the attempt budget
//! - Jittered backoff prevents synchronized retries across sessions

use std::fmt::Debug;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::RetryConfig;
use crate::error::ApiError;
use crate::resilience::backoff::calculate_backoff;

/// Outcome of consulting a strategy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and surface the failure.
    Stop,
    /// Sleep for the given delay, then attempt again.
    RetryAfter(Duration),
}

/// Pluggable retry policy consulted by the executor.
pub trait RetryStrategy: Send + Sync + Debug {
    /// `attempt` is the number of attempts made so far (1 after the first failure).
    fn get_delay(&self, attempt: u32, failure: &ApiError) -> RetryDecision;
}

/// Jittered exponential backoff with bounded delay and attempt count.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl ExponentialBackoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn get_delay(&self, attempt: u32, failure: &ApiError) -> RetryDecision {
        if attempt >= self.max_attempts || !failure.is_retryable() {
            return RetryDecision::Stop;
        }
        RetryDecision::RetryAfter(calculate_backoff(attempt, self.base_delay, self.max_delay))
    }
}

/// Exponential backoff that waits a fixed, long delay after quota rejections.
#[derive(Debug, Clone)]
pub struct QuotaAwareBackoff {
    pub inner: ExponentialBackoff,
    pub quota_delay: Duration,
}

impl QuotaAwareBackoff {
    pub fn new(inner: ExponentialBackoff, quota_delay: Duration) -> Self {
        Self { inner, quota_delay }
    }
}

impl RetryStrategy for QuotaAwareBackoff {
    fn get_delay(&self, attempt: u32, failure: &ApiError) -> RetryDecision {
        match self.inner.get_delay(attempt, failure) {
            RetryDecision::RetryAfter(_) if matches!(failure, ApiError::Quota { .. }) => {
                RetryDecision::RetryAfter(self.quota_delay)
            }
            decision => decision,
        }
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetries;

impl RetryStrategy for NoRetries {
    fn get_delay(&self, _attempt: u32, _failure: &ApiError) -> RetryDecision {
        RetryDecision::Stop
    }
}

/// Build the strategy described by a retry configuration section.
pub fn strategy_from_config(config: &RetryConfig) -> Box<dyn RetryStrategy> {
    if !config.enabled {
        return Box::new(NoRetries);
    }
    let backoff = ExponentialBackoff::from_config(config);
    match config.quota_delay_secs {
        Some(secs) => Box::new(QuotaAwareBackoff::new(backoff, Duration::from_secs(secs))),
        None => Box::new(backoff),
    }
}

/// Parse a `Retry-After` header value.
///
/// Accepts delta-seconds (`"30"`) and HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Dates in the past yield zero.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
