//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions, orchestrator, finalizer, CLI produce:
//!     → tracing events (structured fields: upload id, socket, attempt)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr) when a binary installs it
//!     → any metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The request executor emits nothing; its callers log outcomes
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
