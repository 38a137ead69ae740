//! Cases subsystem.
//!
//! # Data Flow
//! ```text
//! CaseResolution (direct values + completed uploads)
//!     → target.rs (socket checks, request shape per destination)
//!     → finalizer.rs (one create/update call)
//!     → Case snapshot → poll() as often as the caller likes
//! ```

pub mod finalizer;
pub mod target;

pub use finalizer::{Case, CaseFinalizer, CaseResolution};
pub use target::{AlgorithmInterface, CaseKind, CaseTarget, Destination};
