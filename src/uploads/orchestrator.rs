//! Bounded concurrent execution of upload sessions.
//!
//! # Responsibilities
//! - Run at most `concurrency_bound` sessions at once
//! - Start queued requests in FIFO order as slots free up
//! - Report an outcome for every request, keyed by request identity
//!
//! # Data Flow
//! ```text
//! Vec<UploadRequest> → VecDeque (FIFO)
//!     → fill FuturesUnordered up to the bound
//!     → await next finished session → record outcome → refill
//!     → cancelled: stop refilling, drain in-flight, queue → Cancelled
//! ```
//!
//! # Design Decisions
//! - Sessions run as futures on the caller's task; nothing is spawned
//! - One failure never cancels its siblings
//! - The bound approximates the platform's unprocessed-upload quota

use std::collections::{HashMap, VecDeque};

use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::http::RequestExecutor;
use crate::lifecycle::Cancellation;
use crate::observability::metrics;
use crate::sockets::{ResolvedValue, UploadRequest, UploadRequestId};
use crate::uploads::session::{StateObserver, UploadSession};

/// Final result of one upload request.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The content is staged and bound to its socket.
    Completed(ResolvedValue),
    Failed(ApiError),
    /// Never started, or interrupted by cancellation.
    Cancelled,
}

impl UploadOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, UploadOutcome::Completed(_))
    }
}

/// Runs many upload sessions under a concurrency bound.
#[derive(Clone)]
pub struct UploadOrchestrator {
    executor: RequestExecutor,
    concurrency_bound: usize,
    chunk_size: u64,
    observer: Option<StateObserver>,
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("concurrency_bound", &self.concurrency_bound)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl UploadOrchestrator {
    pub fn new(executor: RequestExecutor, config: &UploadConfig) -> Self {
        Self {
            executor,
            concurrency_bound: config.concurrency_bound.max(1),
            chunk_size: config.chunk_size_bytes.max(1),
            observer: None,
        }
    }

    /// Observe every session state transition.
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn concurrency_bound(&self) -> usize {
        self.concurrency_bound
    }

    /// Run every request; the returned map has one entry per request.
    pub async fn run(
        &self,
        requests: Vec<UploadRequest>,
        cancel: &Cancellation,
    ) -> HashMap<UploadRequestId, UploadOutcome> {
        let total = requests.len();
        let mut queue: VecDeque<UploadRequest> = requests.into();
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes = HashMap::with_capacity(total);

        tracing::info!(
            uploads = total,
            concurrency = self.concurrency_bound,
            "Starting upload run"
        );

        loop {
            while in_flight.len() < self.concurrency_bound && !cancel.is_cancelled() {
                match queue.pop_front() {
                    Some(request) => in_flight.push(self.run_session(request, cancel)),
                    None => break,
                }
            }

            match in_flight.next().await {
                Some((id, outcome)) => {
                    outcomes.insert(id, outcome);
                }
                None => break,
            }
        }

        for request in queue {
            metrics::record_upload_session("cancelled");
            outcomes.insert(request.id, UploadOutcome::Cancelled);
        }

        let completed = outcomes.values().filter(|o| o.is_completed()).count();
        tracing::info!(
            uploads = total,
            completed,
            incomplete = total - completed,
            "Upload run finished"
        );

        outcomes
    }

    async fn run_session(
        &self,
        request: UploadRequest,
        cancel: &Cancellation,
    ) -> (UploadRequestId, UploadOutcome) {
        let id = request.id;
        let socket = request.socket_slug.clone();
        tracing::debug!(upload_id = %id, socket = %socket, files = request.sources.len(), "Starting upload session");

        let mut session = UploadSession::new(request, self.observer.clone());
        let outcome = match session.run(&self.executor, self.chunk_size, cancel).await {
            Ok(binding) => {
                metrics::record_upload_session("completed");
                tracing::info!(
                    upload_id = %id,
                    socket = %socket,
                    bytes = session.bytes_transferred(),
                    "Upload session completed"
                );
                UploadOutcome::Completed(ResolvedValue::new(socket, binding))
            }
            Err(ApiError::Cancelled) => {
                metrics::record_upload_session("cancelled");
                tracing::info!(upload_id = %id, socket = %socket, "Upload session cancelled");
                UploadOutcome::Cancelled
            }
            Err(err) => {
                metrics::record_upload_session("failed");
                tracing::warn!(upload_id = %id, socket = %socket, error = %err, "Upload session failed");
                UploadOutcome::Failed(err)
            }
        };

        (id, outcome)
    }
}
