//! Metrics collection.
//!
//! # Metrics
//! - `gc_upload_sessions_total` (counter): finished sessions by outcome
//! - `gc_upload_bytes_total` (counter): content bytes accepted by storage
//! - `gc_cases_finalized_total` (counter): finalize calls by case kind
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no exporter is installed here
//! - Without a recorder every call is a no-op

/// Record a finished upload session. `outcome` is `completed`, `failed` or `cancelled`.
pub fn record_upload_session(outcome: &'static str) {
    metrics::counter!("gc_upload_sessions_total", "outcome" => outcome).increment(1);
}

pub fn record_upload_bytes(bytes: u64) {
    metrics::counter!("gc_upload_bytes_total").increment(bytes);
}

pub fn record_case_finalized(kind: &'static str) {
    metrics::counter!("gc_cases_finalized_total", "kind" => kind).increment(1);
}
