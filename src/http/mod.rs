//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest (request.rs)
//!     → RequestExecutor (executor.rs): resolve, authorize, retry loop
//!     → Transport (transport.rs): one attempt over reqwest
//!     → ApiResponse (response.rs) or ApiError
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered; uploads are chunked by the caller
//! - The transport is a trait seam so tests can script the server

pub mod executor;
pub mod request;
pub mod response;
pub mod transport;

pub use executor::RequestExecutor;
pub use request::{ApiRequest, Body, Target};
pub use response::ApiResponse;
pub use transport::{FnTransport, ReqwestTransport, Transport, TransportRequest};
