//! High-level client tying the subsystems together.
//!
//! # Data Flow
//! ```text
//! specs + target
//!     → target.check_sockets (accepted / required / interface)
//!     → sockets::resolve_case (direct values | upload requests)
//!     → UploadOrchestrator::run (bounded sessions)
//!     → UploadRunOutcome::Complete(CaseResolution) | Partial
//!     → CaseFinalizer::finalize → Case → poll
//! ```

use std::sync::Arc;

use futures_util::Stream;
use serde::de::DeserializeOwned;

use crate::cases::{Case, CaseFinalizer, CaseResolution, CaseTarget};
use crate::config::loader::{apply_env_token, env_token};
use crate::config::{validate_config, ClientConfig, ConfigError};
use crate::error::{ApiError, ApiResult};
use crate::http::{RequestExecutor, Transport};
use crate::lifecycle::Cancellation;
use crate::pagination::PageIterator;
use crate::sockets::{resolve_case, Resolution, ResolvedValue, SocketValueSpec};
use crate::uploads::{StateObserver, UploadOrchestrator, UploadOutcome};

/// An upload that did not complete.
#[derive(Debug)]
pub struct UploadFailure {
    pub socket_slug: String,
    /// `Failed` or `Cancelled`.
    pub outcome: UploadOutcome,
}

/// Result of resolving and uploading one case's values.
#[derive(Debug)]
pub enum UploadRunOutcome {
    /// Every value is bound; ready to finalize.
    Complete(CaseResolution),
    /// Some uploads failed or were cancelled. Completed values stay usable
    /// and only the failed specs need to be retried.
    Partial {
        completed: Vec<ResolvedValue>,
        failures: Vec<UploadFailure>,
    },
}

impl UploadRunOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, UploadRunOutcome::Complete(_))
    }
}

/// Client for the platform's list, upload and case endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    executor: RequestExecutor,
    pages: PageIterator,
    orchestrator: UploadOrchestrator,
    finalizer: CaseFinalizer,
}

impl Client {
    /// Validate `config` and build a client over `reqwest`.
    ///
    /// An unset token falls back to `GRAND_CHALLENGE_AUTHORIZATION`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let config = prepare(config, env_token())?;
        let executor = RequestExecutor::from_config(&config)?;
        Ok(Self::from_executor(executor, &config))
    }

    /// Validate `config` and build a client over any transport.
    ///
    /// An unset token falls back to `GRAND_CHALLENGE_AUTHORIZATION`.
    pub fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        Self::with_transport_and_env_token(config, transport, env_token())
    }

    /// As `with_transport`, with `env_token` standing in for the environment.
    pub fn with_transport_and_env_token(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        env_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = prepare(config, env_token)?;
        let executor = RequestExecutor::with_transport(&config, transport)?;
        Ok(Self::from_executor(executor, &config))
    }

    /// Build from an existing executor; `config` supplies the upload and
    /// pagination settings.
    pub fn from_executor(executor: RequestExecutor, config: &ClientConfig) -> Self {
        Self {
            pages: PageIterator::new(executor.clone(), config.pagination.page_size),
            orchestrator: UploadOrchestrator::new(executor.clone(), &config.uploads),
            finalizer: CaseFinalizer::new(executor.clone()),
            executor,
        }
    }

    /// Observe upload session state transitions.
    pub fn with_upload_observer(mut self, observer: StateObserver) -> Self {
        self.orchestrator = self.orchestrator.with_observer(observer);
        self
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn pages(&self) -> &PageIterator {
        &self.pages
    }

    /// Lazily stream every record of a list endpoint.
    pub fn iterate<T>(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
        cancel: Cancellation,
    ) -> impl Stream<Item = ApiResult<T>> + Send + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.pages.iterate_all(endpoint, params, cancel)
    }

    /// Resolve `specs` for `target` and run the uploads they need.
    ///
    /// Fails with `Validation` before any network call when the specs do
    /// not fit the target. Upload failures are reported per socket in
    /// `UploadRunOutcome::Partial`.
    pub async fn run_upload(
        &self,
        specs: &[SocketValueSpec],
        target: &CaseTarget,
        cancel: &Cancellation,
    ) -> ApiResult<UploadRunOutcome> {
        let resolutions = resolve_case(specs, &target.catalog)?;
        target.check_sockets(specs.iter().map(|s| s.socket_slug.as_str()))?;

        let mut slots: Vec<Option<ResolvedValue>> = Vec::with_capacity(resolutions.len());
        let mut pending = Vec::new();
        let mut requests = Vec::new();
        for (index, resolution) in resolutions.into_iter().enumerate() {
            match resolution {
                Resolution::Resolved(value) => slots.push(Some(value)),
                Resolution::Upload(request) => {
                    slots.push(None);
                    pending.push((index, request.id, request.socket_slug.clone()));
                    requests.push(request);
                }
            }
        }

        tracing::info!(
            target_kind = target.kind().as_str(),
            values = slots.len(),
            uploads = requests.len(),
            "Resolved case values"
        );

        let mut outcomes = if requests.is_empty() {
            Default::default()
        } else {
            self.orchestrator.run(requests, cancel).await
        };

        let mut failures = Vec::new();
        for (index, id, socket_slug) in pending {
            match outcomes.remove(&id) {
                Some(UploadOutcome::Completed(value)) => slots[index] = Some(value),
                Some(outcome) => failures.push(UploadFailure {
                    socket_slug,
                    outcome,
                }),
                None => failures.push(UploadFailure {
                    socket_slug,
                    outcome: UploadOutcome::Cancelled,
                }),
            }
        }

        let completed: Vec<ResolvedValue> = slots.into_iter().flatten().collect();
        if failures.is_empty() {
            Ok(UploadRunOutcome::Complete(CaseResolution::new(completed)))
        } else {
            Ok(UploadRunOutcome::Partial {
                completed,
                failures,
            })
        }
    }

    pub async fn finalize(
        &self,
        target: &CaseTarget,
        resolution: CaseResolution,
        cancel: &Cancellation,
    ) -> ApiResult<Case> {
        self.finalizer.finalize(target, resolution, cancel).await
    }

    pub async fn poll(&self, case: &Case, cancel: &Cancellation) -> ApiResult<Case> {
        self.finalizer.poll(case, cancel).await
    }

    /// Upload and finalize in one go. The first upload error is returned
    /// when any upload does not complete.
    pub async fn create_case(
        &self,
        specs: &[SocketValueSpec],
        target: &CaseTarget,
        cancel: &Cancellation,
    ) -> ApiResult<Case> {
        match self.run_upload(specs, target, cancel).await? {
            UploadRunOutcome::Complete(resolution) => {
                self.finalize(target, resolution, cancel).await
            }
            UploadRunOutcome::Partial { failures, .. } => {
                for failure in &failures {
                    tracing::warn!(socket = %failure.socket_slug, outcome = ?failure.outcome, "Upload incomplete");
                }
                let first = failures.into_iter().find_map(|f| match f.outcome {
                    UploadOutcome::Failed(err) => Some(err),
                    _ => None,
                });
                Err(first.unwrap_or(ApiError::Cancelled))
            }
        }
    }
}

fn prepare(config: &ClientConfig, env_token: Option<String>) -> Result<ClientConfig, ConfigError> {
    let mut config = config.clone();
    apply_env_token(&mut config, env_token);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
