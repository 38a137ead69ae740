//! Sockets subsystem.
//!
//! # Data Flow
//! ```text
//! caller specs (files | value | existing reference)
//!     → resolver.rs (validate against SocketCatalog)
//!     → Resolution::Resolved(ResolvedValue)   sent as is by the finalizer
//!     → Resolution::Upload(UploadRequest)     staged by the orchestrator first
//! ```
//!
//! # Design Decisions
//! - All validation is local; resolving never issues a request
//! - A multi-file image is one upload request, hence one session

pub mod resolver;
pub mod types;

pub use resolver::{resolve, resolve_case};
pub use types::{
    Binding, ExistingReference, ExistingSocketValue, Resolution, ResolvedValue, Socket,
    SocketCatalog, SocketValueSpec, SuperKind, UploadKind, UploadRequest, UploadRequestId,
    UploadSource,
};
