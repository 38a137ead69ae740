//! Request executor.
//!
//! # Responsibilities
//! - Resolve request targets against the configured API root
//! - Attach the authorization header to platform requests only
//! - Apply the retry strategy across attempts
//! - Normalize every failure into an `ApiError` kind
//!
//! # Data Flow
//! ```text
//! ApiRequest
//!     → resolve_url (path join / origin check / external passthrough)
//!     → attempt loop:
//!         cancelled?            → Err(Cancelled)
//!         transport.send        → classify status
//!         success               → Ok(ApiResponse)
//!         failure               → strategy.get_delay(attempt, &error)
//!             Stop              → Err(error)
//!             RetryAfter(d)     → sleep(Retry-After header or d), repeat
//! ```
//!
//! # Design Decisions
//! - The executor holds explicit configuration only; no ambient state
//! - It emits no log events; callers decide what is worth logging
//! - Non-retryable kinds stop the loop even if a custom strategy says otherwise
//! - Cancellation is observed before each attempt, during it, and during sleeps

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{ClientConfig, ConfigError, ConfigIssue};
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::http::request::{ApiRequest, Body, Target};
use crate::http::response::ApiResponse;
use crate::http::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::lifecycle::Cancellation;
use crate::resilience::{strategy_from_config, ExponentialBackoff, RetryDecision, RetryStrategy};

/// Issues logical HTTP operations with retries.
#[derive(Clone)]
pub struct RequestExecutor {
    base_url: Url,
    authorization: Option<HeaderValue>,
    quota_status: u16,
    strategy: Arc<dyn RetryStrategy>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url.as_str())
            .field("authorized", &self.authorization.is_some())
            .field("quota_status", &self.quota_status)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl RequestExecutor {
    /// Executor with default retries, no authorization and quota status 429.
    pub fn new(base_url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            authorization: None,
            quota_status: 429,
            strategy: Arc::new(ExponentialBackoff::default()),
            transport,
        }
    }

    /// Build an executor over `reqwest` from a validated configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.api.timeout_secs))
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build an executor over any transport from a configuration.
    pub fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            ConfigError::Validation(vec![ConfigIssue::new(
                "api.base_url",
                format!("invalid URL: {e}"),
            )])
        })?;

        let authorization = match config.api.authorization_header() {
            Some(value) => Some(HeaderValue::from_str(&value).map_err(|_| {
                ConfigError::Validation(vec![ConfigIssue::new(
                    "api.token",
                    "token contains invalid header characters",
                )])
            })?),
            None => None,
        };

        Ok(Self {
            base_url,
            authorization,
            quota_status: config.api.quota_status,
            strategy: Arc::from(strategy_from_config(&config.retries)),
            transport,
        })
    }

    pub fn with_authorization(mut self, value: HeaderValue) -> Self {
        self.authorization = Some(value);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_quota_status(mut self, status: u16) -> Self {
        self.quota_status = status;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute a request, retrying transient failures.
    pub async fn execute(
        &self,
        request: &ApiRequest,
        cancel: &Cancellation,
    ) -> ApiResult<ApiResponse> {
        let (url, authorize) = self.resolve_url(request)?;
        let headers = self.build_headers(request, authorize)?;
        let body = match &request.body {
            Body::Empty => None,
            Body::Json(value) => Some(
                serde_json::to_vec(value)
                    .map_err(|e| ApiError::Encode(e.to_string()))?
                    .into(),
            ),
            Body::Bytes(bytes) => Some(bytes.clone()),
        };

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            attempt += 1;

            let attempt_request = TransportRequest {
                method: request.method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                result = self.transport.send(attempt_request) => self.classify(result),
            };

            let failure = match outcome {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !failure.is_retryable() {
                return Err(failure);
            }

            let delay = match self.strategy.get_delay(attempt, &failure) {
                RetryDecision::Stop => return Err(failure),
                RetryDecision::RetryAfter(computed) => failure.retry_after().unwrap_or(computed),
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Execute a request and decode the JSON body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: &Cancellation,
    ) -> ApiResult<T> {
        self.execute(request, cancel).await?.json_body()
    }

    /// Resolve the target to an absolute URL with the query applied.
    ///
    /// The returned flag says whether the authorization header may be sent.
    pub fn resolve_url(&self, request: &ApiRequest) -> ApiResult<(Url, bool)> {
        let (mut url, authorize) = match &request.target {
            Target::Path(path) => {
                let url = self
                    .base_url
                    .join(path.trim_start_matches('/'))
                    .map_err(|e| invalid_target(format!("{path}: {e}")))?;
                self.check_platform_url(&url)?;
                (url, true)
            }
            Target::Url(raw) => {
                let url = Url::parse(raw).map_err(|e| invalid_target(format!("{raw}: {e}")))?;
                self.check_platform_url(&url)?;
                (url, true)
            }
            Target::External(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(invalid_target(format!("unsupported scheme in {url}")));
                }
                (url.clone(), false)
            }
        };

        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok((url, authorize))
    }

    fn check_platform_url(&self, url: &Url) -> ApiResult<()> {
        let same_origin = url.scheme() == self.base_url.scheme()
            && url.host_str() == self.base_url.host_str()
            && url.port_or_known_default() == self.base_url.port_or_known_default();
        if same_origin {
            Ok(())
        } else {
            Err(invalid_target(format!(
                "{url} is not on {}",
                self.base_url.origin().ascii_serialization()
            )))
        }
    }

    fn build_headers(&self, request: &ApiRequest, authorize: bool) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if authorize {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
            if let Some(value) = &self.authorization {
                headers.insert(AUTHORIZATION, value.clone());
            }
        }
        if matches!(request.body, Body::Json(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| invalid_target(format!("invalid header name {name:?}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| invalid_target(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn classify(&self, result: Result<ApiResponse, String>) -> ApiResult<ApiResponse> {
        let response = result.map_err(ApiError::Transport)?;
        if response.is_success() {
            return Ok(response);
        }

        let status = response.status;
        if status == self.quota_status {
            Err(ApiError::Quota {
                status,
                retry_after: response.retry_after(),
                body: response.text(),
            })
        } else if status >= 500 {
            Err(ApiError::Server {
                status,
                retry_after: response.retry_after(),
                body: response.text(),
            })
        } else {
            Err(ApiError::Client {
                status,
                body: response.text(),
            })
        }
    }
}

fn invalid_target(message: String) -> ApiError {
    ValidationError::InvalidTarget(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::FnTransport;
    use crate::resilience::NoRetries;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn base() -> Url {
        Url::parse("https://gc.test/api/v1/").unwrap()
    }

    fn scripted(statuses: Vec<u16>) -> (Arc<dyn Transport>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let transport = FnTransport::new(move |_request: TransportRequest| {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let status = statuses[n.min(statuses.len() - 1)];
            async move { Ok(ApiResponse::new(status, "{}")) }
        });
        (Arc::new(transport), calls)
    }

    fn fast_backoff(max_attempts: u32) -> Arc<dyn RetryStrategy> {
        Arc::new(ExponentialBackoff {
            max_attempts,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        })
    }

    #[test]
    fn test_resolve_url() {
        let (transport, _) = scripted(vec![200]);
        let executor = RequestExecutor::new(base(), transport);

        let (url, auth) = executor
            .resolve_url(&ApiRequest::get("/uploads/").query("limit", 10))
            .unwrap();
        assert_eq!(url.as_str(), "https://gc.test/api/v1/uploads/?limit=10");
        assert!(auth);

        let (_, auth) = executor
            .resolve_url(&ApiRequest::get_url("https://gc.test/api/v1/cases/images/x/"))
            .unwrap();
        assert!(auth);

        let err = executor
            .resolve_url(&ApiRequest::get_url("https://evil.test/api/v1/"))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidTarget(_))
        ));

        let external = Url::parse("https://bucket.s3.test/part?sig=1").unwrap();
        let (_, auth) = executor
            .resolve_url(&ApiRequest::put_external(external, "x".into()))
            .unwrap();
        assert!(!auth);
    }

    #[tokio::test]
    async fn test_external_requests_skip_authorization() {
        let transport = FnTransport::new(|request: TransportRequest| async move {
            let status = if request.header("authorization").is_some() { 400 } else { 200 };
            Ok(ApiResponse::new(status, ""))
        });
        let executor = RequestExecutor::new(base(), Arc::new(transport))
            .with_authorization(HeaderValue::from_static("BEARER secret"));

        let external = Url::parse("https://bucket.s3.test/part").unwrap();
        let response = executor
            .execute(&ApiRequest::put_external(external, "x".into()), &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_success() {
        let (transport, calls) = scripted(vec![503, 429, 200]);
        let executor = RequestExecutor::new(base(), transport).with_strategy(fast_backoff(5));

        let response = executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_keep_error_kind() {
        let (transport, calls) = scripted(vec![502]);
        let executor = RequestExecutor::new(base(), transport).with_strategy(fast_backoff(3));

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 502, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let (transport, calls) = scripted(vec![404, 200]);
        let executor = RequestExecutor::new(base(), transport).with_strategy(fast_backoff(5));

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Client { status: 404, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_quota_status() {
        let (transport, _) = scripted(vec![403]);
        let executor = RequestExecutor::new(base(), transport)
            .with_strategy(Arc::new(NoRetries))
            .with_quota_status(403);

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Quota { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let transport = FnTransport::new(|_request: TransportRequest| async move {
            Err::<ApiResponse, _>("connection refused".to_string())
        });
        let executor =
            RequestExecutor::new(base(), Arc::new(transport)).with_strategy(Arc::new(NoRetries));

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(ref m) if m == "connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_overrides_strategy_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let transport = FnTransport::new(move |_request: TransportRequest| {
            let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if first {
                    Ok(ApiResponse::new(429, "").with_header("Retry-After", "30"))
                } else {
                    Ok(ApiResponse::new(200, "{}"))
                }
            }
        });
        let executor =
            RequestExecutor::new(base(), Arc::new(transport)).with_strategy(fast_backoff(3));

        let started = tokio::time::Instant::now();
        executor
            .execute(&ApiRequest::get("uploads/"), &Cancellation::new())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let (transport, calls) = scripted(vec![503]);
        let executor = RequestExecutor::new(base(), transport).with_strategy(Arc::new(
            ExponentialBackoff {
                max_attempts: 10,
                base_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
            },
        ));

        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.trigger();
        });

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let (transport, calls) = scripted(vec![200]);
        let executor = RequestExecutor::new(base(), transport);
        let cancel = Cancellation::new();
        cancel.trigger();

        let err = executor
            .execute(&ApiRequest::get("uploads/"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
