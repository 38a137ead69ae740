//! Resilient transfer and pagination client for Grand Challenge.
//!
//! Moves imaging data into archives, reader studies and algorithm jobs, and
//! reads paginated result sets back, over a connection subject to transient
//! failures and server-imposed quotas.
//!
//! # Architecture Overview
//!
//! ```text
//!   socket-value specs                               list endpoint + params
//!          │                                                  │
//!          ▼                                                  ▼
//!   ┌──────────────┐   values    ┌──────────────┐     ┌──────────────┐
//!   │   sockets    │────────────▶│    cases     │     │  pagination  │
//!   │   resolver   │             │  finalizer   │     │ PageIterator │
//!   └──────┬───────┘             └──────┬───────┘     └──────┬───────┘
//!          │ upload requests            │ finalize / poll    │ pages
//!          ▼                            │                    │
//!   ┌──────────────┐                    │                    │
//!   │   uploads    │ completed values   │                    │
//!   │ orchestrator │────────────────────┘                    │
//!   │  + sessions  │                                         │
//!   └──────┬───────┘                                         │
//!          │ register / presign / PUT / complete             │
//!          ▼                                                 ▼
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │               http::RequestExecutor                          │
//!   │  resilience::RetryStrategy · Retry-After · Cancellation     │
//!   └──────────────────────────────┬──────────────────────────────┘
//!                                  ▼
//!                        http::Transport (reqwest)
//!
//!   Cross-cutting: config (TOML) · observability (tracing, metrics) · lifecycle
//! ```

// Core subsystems
pub mod client;
pub mod config;
pub mod error;
pub mod http;

// Transfer and read paths
pub mod cases;
pub mod pagination;
pub mod sockets;
pub mod uploads;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use cases::{AlgorithmInterface, Case, CaseResolution, CaseTarget};
pub use client::{Client, UploadFailure, UploadRunOutcome};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult, ValidationError};
pub use http::RequestExecutor;
pub use lifecycle::Cancellation;
pub use pagination::PageIterator;
pub use resilience::{RetryDecision, RetryStrategy};
pub use sockets::{
    ExistingReference, ResolvedValue, Socket, SocketCatalog, SocketValueSpec, SuperKind,
};
pub use uploads::{UploadOrchestrator, UploadOutcome};
