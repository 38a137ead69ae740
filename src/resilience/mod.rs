//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed attempt (ApiError):
//!     → retries.rs (strategy: stop, or wait D)
//!     → backoff.rs (jittered exponential D)
//!     → executor sleeps for the Retry-After header if present, else D
//! ```
//!
//! # Design Decisions
//! - Only transport failures, 5xx and the quota status are retryable
//! - Strategies are swappable per client
//! - Server-provided Retry-After is authoritative and not capped

pub mod backoff;
pub mod retries;

pub use retries::{
    parse_retry_after, strategy_from_config, ExponentialBackoff, NoRetries, QuotaAwareBackoff,
    RetryDecision, RetryStrategy,
};
