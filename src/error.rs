//! Error taxonomy shared by every subsystem.
//!
//! # Kinds
//! ```text
//! Transport   no response received (connect, TLS, timeout)      retried
//! Server      5xx response                                      retried
//! Quota       designated 4xx rate/quota status (default 429)    retried
//! Client      any other 4xx                                     never retried
//! Validation  local pre-flight violation, nothing was sent      never retried
//! Encode      request body could not be serialized              never retried
//! Cancelled   caller-supplied cancellation signal observed      never retried
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the executor and everything built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a 5xx status.
    #[error("server error: HTTP {status}")]
    Server {
        status: u16,
        retry_after: Option<Duration>,
        body: String,
    },

    /// The server rejected the request with the designated quota status.
    #[error("quota or rate limit exceeded: HTTP {status}")]
    Quota {
        status: u16,
        retry_after: Option<Duration>,
        body: String,
    },

    /// The server rejected the request as a caller error.
    #[error("client error: HTTP {status}: {body}")]
    Client { status: u16, body: String },

    /// Local contract violation, nothing was sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Zero objects found when exactly one was expected.
    #[error("object not found")]
    NotFound,

    /// More than one object found when exactly one was expected.
    #[error("multiple objects returned ({0})")]
    MultipleObjectsReturned(u64),

    /// The request body could not be serialized, nothing was sent.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A local file could not be read while transferring it.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Whether the executor may attempt the request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_) | ApiError::Server { .. } | ApiError::Quota { .. }
        )
    }

    /// Server-directed delay carried by the failed response, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::Server { retry_after, .. } | ApiError::Quota { retry_after, .. } => {
                *retry_after
            }
            _ => None,
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. }
            | ApiError::Quota { status, .. }
            | ApiError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pre-flight violations detected before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("socket {0:?} is not known to this case target")]
    UnknownSocket(String),

    #[error("socket {0:?} appears more than once in the same case")]
    DuplicateSocket(String),

    #[error("socket {slug:?} has more than one source set: {sources}")]
    MultiplePayloads { slug: String, sources: String },

    #[error("socket {0:?} has no source set")]
    NoPayload(String),

    #[error("socket {0:?} holds values and cannot receive files")]
    FilesForValueSocket(String),

    #[error("socket {slug:?} has super kind {super_kind} and cannot receive a bare value")]
    ScalarForFileSocket { slug: String, super_kind: String },

    #[error("socket {slug:?} accepts {max} file(s), got {got}")]
    TooManyFiles { slug: String, max: usize, got: usize },

    #[error("socket {0:?} was given an empty file list")]
    NoFiles(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("value for socket {slug:?} is not JSON serializable: {reason}")]
    NotSerializable { slug: String, reason: String },

    #[error("socket {slug:?} cannot use reference: {reason}")]
    InvalidReference { slug: String, reason: String },

    #[error("required socket {0:?} has no value")]
    MissingSocket(String),

    #[error("no matching interface for sockets {given:?}{}", closest_suffix(.closest))]
    NoMatchingInterface {
        given: Vec<String>,
        closest: Option<Vec<String>>,
    },

    #[error("invalid request target: {0}")]
    InvalidTarget(String),
}

fn closest_suffix(closest: &Option<Vec<String>>) -> String {
    match closest {
        Some(slugs) => format!("; closest match is {slugs:?}"),
        None => String::new(),
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
