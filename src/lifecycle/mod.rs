//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Caller creates Cancellation
//!     → passed to executor / orchestrator / finalizer calls
//!     → trigger(): no new sessions start, pending attempts and sleeps
//!       resolve to ApiError::Cancelled
//! signals.rs: Ctrl-C → trigger()
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative; completed work is never rolled back
//! - Cancellation is never retried

pub mod cancellation;
pub mod signals;

pub use cancellation::Cancellation;
pub use signals::cancel_on_ctrl_c;
