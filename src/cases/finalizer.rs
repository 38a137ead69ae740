//! Case finalization and status polling.
//!
//! # Responsibilities
//! - Validate a resolution against its target before sending anything
//! - Issue the single create/update call referencing every value
//! - Refresh a case snapshot on demand
//!
//! # Design Decisions
//! - Polling is one request per call; the caller decides when to wait
//! - A resolution is consumed by finalize and cannot be replayed

use serde_json::Value;

use crate::cases::target::{CaseKind, CaseTarget};
use crate::error::{ApiError, ApiResult};
use crate::http::{ApiRequest, RequestExecutor};
use crate::lifecycle::Cancellation;
use crate::observability::metrics;
use crate::sockets::ResolvedValue;

/// Fully resolved socket values for one case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaseResolution {
    values: Vec<ResolvedValue>,
}

impl CaseResolution {
    pub fn new(values: Vec<ResolvedValue>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, value: ResolvedValue) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[ResolvedValue] {
        &self.values
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.socket_slug.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<ResolvedValue> for CaseResolution {
    fn from_iter<I: IntoIterator<Item = ResolvedValue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Snapshot of a case on the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub kind: CaseKind,
    pub pk: String,
    pub api_url: String,
    /// Processing status, reported for jobs.
    pub status: Option<String>,
    /// Sockets that currently hold a value.
    pub socket_slugs: Vec<String>,
    /// Sockets the finalize call referenced.
    pub expected_sockets: Vec<String>,
    /// Raw response body.
    pub raw: Value,
}

impl Case {
    /// Parse a case record. `values` or `inputs` carry the socket values.
    pub fn from_record(kind: CaseKind, raw: Value, expected_sockets: Vec<String>) -> ApiResult<Self> {
        let api_url = raw
            .get("api_url")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Decode("case record has no api_url".into()))?
            .to_string();
        let pk = match raw.get("pk") {
            Some(Value::String(pk)) => pk.clone(),
            Some(Value::Number(pk)) => pk.to_string(),
            _ => return Err(ApiError::Decode("case record has no pk".into())),
        };
        let status = raw.get("status").and_then(Value::as_str).map(String::from);

        let socket_slugs = raw
            .get("values")
            .or_else(|| raw.get("inputs"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(value_socket_slug).collect())
            .unwrap_or_default();

        Ok(Self {
            kind,
            pk,
            api_url,
            status,
            socket_slugs,
            expected_sockets,
            raw,
        })
    }

    /// True once every finalized socket shows up in the case's values.
    ///
    /// Image uploads only appear after server-side import, so this turns
    /// true some time after finalization.
    pub fn is_processed(&self) -> bool {
        self.expected_sockets
            .iter()
            .all(|slug| self.socket_slugs.contains(slug))
    }
}

/// Socket slug of a hyperlinked value: `"interface"` is a slug or an object.
fn value_socket_slug(item: &Value) -> Option<String> {
    match item.get("interface")? {
        Value::String(slug) => Some(slug.clone()),
        Value::Object(interface) => interface.get("slug")?.as_str().map(String::from),
        _ => None,
    }
}

/// Creates or updates cases and polls their status.
#[derive(Debug, Clone)]
pub struct CaseFinalizer {
    executor: RequestExecutor,
}

impl CaseFinalizer {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// Validate, then issue the one call that references every value.
    pub async fn finalize(
        &self,
        target: &CaseTarget,
        resolution: CaseResolution,
        cancel: &Cancellation,
    ) -> ApiResult<Case> {
        target.check_sockets(resolution.slugs())?;

        let kind = target.kind();
        let expected: Vec<String> = resolution.slugs().map(String::from).collect();
        let request = target.finalize_request(resolution.values());

        let raw: Value = match self.executor.execute_json(&request, cancel).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(kind = kind.as_str(), error = %err, "Finalize failed");
                return Err(err);
            }
        };
        let case = Case::from_record(kind, raw, expected)?;

        metrics::record_case_finalized(kind.as_str());
        tracing::info!(
            kind = kind.as_str(),
            case = %case.api_url,
            values = case.expected_sockets.len(),
            "Case finalized"
        );
        Ok(case)
    }

    /// Fetch a fresh snapshot of `case`. Never waits.
    pub async fn poll(&self, case: &Case, cancel: &Cancellation) -> ApiResult<Case> {
        let raw: Value = self
            .executor
            .execute_json(&ApiRequest::get_url(&case.api_url), cancel)
            .await?;
        let refreshed = Case::from_record(case.kind, raw, case.expected_sockets.clone())?;
        tracing::debug!(
            case = %refreshed.api_url,
            status = ?refreshed.status,
            processed = refreshed.is_processed(),
            "Polled case"
        );
        Ok(refreshed)
    }
}
