//! Uploads subsystem.
//!
//! # Data Flow
//! ```text
//! UploadRequest (from the socket resolver)
//!     → orchestrator.rs (bounded pool, FIFO queue)
//!     → session.rs (register → transfer parts → complete)
//!     → protocol.rs (staging endpoint wire shapes)
//!     → UploadOutcome per request
//! ```

pub mod orchestrator;
pub mod protocol;
pub mod session;

pub use orchestrator::{UploadOrchestrator, UploadOutcome};
pub use session::{SessionState, StateObserver, UploadSession};
