//! Outgoing request description.
//!
//! # Responsibilities
//! - Describe one logical operation independently of any attempt
//! - Distinguish platform paths, platform URLs and external (presigned) URLs
//! - Carry query parameters, extra headers and the body
//!
//! # Design Decisions
//! - Requests are plain data and cheap to clone; bodies are `Bytes`
//! - URL resolution and authorization happen in the executor, not here

use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// Where a request is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Path relative to the configured API root, e.g. `"uploads/"`.
    Path(String),
    /// Absolute URL on the platform, e.g. an `api_url` field of a record.
    Url(String),
    /// URL outside the platform API (presigned storage URL). Sent without
    /// the authorization header.
    External(Url),
}

impl Target {
    /// `Url` for absolute URLs, `Path` for everything else.
    pub fn from_location(location: &str) -> Self {
        if location.contains("://") {
            Target::Url(location.to_string())
        } else {
            Target::Path(location.to_string())
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Bytes(Bytes),
}

/// One logical HTTP operation.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub target: Target,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, Target::Path(path.into()))
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, Target::Path(path.into())).json(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, Target::Path(path.into())).json(body)
    }

    /// GET an absolute platform URL.
    pub fn get_url(url: impl Into<String>) -> Self {
        Self::new(Method::GET, Target::Url(url.into()))
    }

    /// PUT raw bytes to an external URL.
    pub fn put_external(url: Url, body: Bytes) -> Self {
        Self::new(Method::PUT, Target::External(url)).bytes(body)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn bytes(mut self, body: Bytes) -> Self {
        self.body = Body::Bytes(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append many query parameters, keeping their order.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
