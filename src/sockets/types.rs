//! Socket and socket-value types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Broad category of content a socket holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuperKind {
    Image,
    File,
    Value,
}

impl SuperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuperKind::Image => "image",
            SuperKind::File => "file",
            SuperKind::Value => "value",
        }
    }
}

impl fmt::Display for SuperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuperKind {
    type Err = String;

    /// Case-insensitive, the platform reports `"Image"`, `"File"`, `"Value"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(SuperKind::Image),
            "file" => Ok(SuperKind::File),
            "value" => Ok(SuperKind::Value),
            other => Err(format!("unknown super kind {other:?}")),
        }
    }
}

impl<'de> Deserialize<'de> for SuperKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Immutable descriptor of a typed input/output slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    pub slug: String,
    #[serde(default)]
    pub kind: String,
    pub super_kind: SuperKind,
    #[serde(default)]
    pub relative_path: String,
    /// Whether a case must carry a value for this socket.
    #[serde(default)]
    pub required: bool,
}

impl Socket {
    /// File sockets default to `{slug}.json`, the name structured values are stored under.
    pub fn new(slug: impl Into<String>, kind: impl Into<String>, super_kind: SuperKind) -> Self {
        let slug = slug.into();
        let relative_path = match super_kind {
            SuperKind::File => format!("{slug}.json"),
            _ => slug.clone(),
        };
        Self {
            relative_path,
            slug,
            kind: kind.into(),
            super_kind,
            required: false,
        }
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = path.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// The sockets a case target accepts, keyed by slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketCatalog {
    sockets: BTreeMap<String, Socket>,
}

impl SocketCatalog {
    pub fn new(sockets: impl IntoIterator<Item = Socket>) -> Self {
        Self {
            sockets: sockets.into_iter().map(|s| (s.slug.clone(), s)).collect(),
        }
    }

    pub fn get(&self, slug: &str) -> Option<&Socket> {
        self.sockets.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.sockets.contains_key(slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Socket> {
        self.sockets.values()
    }

    /// Slugs of sockets that must receive a value.
    pub fn required_slugs(&self) -> impl Iterator<Item = &str> {
        self.sockets
            .values()
            .filter(|s| s.required)
            .map(|s| s.slug.as_str())
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}

/// A socket value already present on the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingSocketValue {
    /// Slug of the socket the value belongs to.
    pub socket_slug: String,
    pub image: Option<String>,
    /// Platform URL of the stored file, for file sockets.
    pub file: Option<String>,
    pub value: Option<Value>,
}

/// A reference to something already uploaded.
#[derive(Debug, Clone, PartialEq)]
pub enum ExistingReference {
    /// API URL of an existing image.
    Image(String),
    /// API URL of a completed user upload.
    UserUpload(String),
    /// An existing socket value to reuse.
    SocketValue(ExistingSocketValue),
}

/// Caller-supplied description of one socket value.
///
/// Exactly one source must be set; the resolver rejects anything else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SocketValueSpec {
    pub socket_slug: String,
    pub files: Option<Vec<PathBuf>>,
    pub value: Option<Value>,
    pub existing: Option<ExistingReference>,
}

impl SocketValueSpec {
    /// A spec with no source set yet.
    pub fn new(socket_slug: impl Into<String>) -> Self {
        Self {
            socket_slug: socket_slug.into(),
            ..Self::default()
        }
    }

    pub fn from_files<P: Into<PathBuf>>(
        socket_slug: impl Into<String>,
        files: impl IntoIterator<Item = P>,
    ) -> Self {
        Self::new(socket_slug).with_files(files)
    }

    pub fn from_value(socket_slug: impl Into<String>, value: Value) -> Self {
        Self::new(socket_slug).with_value(value)
    }

    pub fn from_existing(socket_slug: impl Into<String>, existing: ExistingReference) -> Self {
        Self::new(socket_slug).with_existing(existing)
    }

    pub fn with_files<P: Into<PathBuf>>(mut self, files: impl IntoIterator<Item = P>) -> Self {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_existing(mut self, existing: ExistingReference) -> Self {
        self.existing = Some(existing);
        self
    }

    /// Names of the source fields that are set.
    pub fn set_sources(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.files.is_some() {
            sources.push("files");
        }
        if self.value.is_some() {
            sources.push("value");
        }
        if self.existing.is_some() {
            sources.push("existing");
        }
        sources
    }
}

/// How a resolved socket value is referenced in a finalize call.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Image(String),
    UserUpload(String),
    UploadSession(String),
}

/// A socket value ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub socket_slug: String,
    pub binding: Binding,
}

impl ResolvedValue {
    pub fn new(socket_slug: impl Into<String>, binding: Binding) -> Self {
        Self {
            socket_slug: socket_slug.into(),
            binding,
        }
    }

    /// Wire form: `{"interface": slug, <binding field>: ...}`.
    pub fn to_post(&self) -> Value {
        let (field, value) = match &self.binding {
            Binding::Value(v) => ("value", v.clone()),
            Binding::Image(url) => ("image", Value::String(url.clone())),
            Binding::UserUpload(url) => ("user_upload", Value::String(url.clone())),
            Binding::UploadSession(url) => ("upload_session", Value::String(url.clone())),
        };
        let mut post = serde_json::Map::new();
        post.insert("interface".to_string(), Value::String(self.socket_slug.clone()));
        post.insert(field.to_string(), value);
        Value::Object(post)
    }
}

/// Identity of one upload request within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadRequestId(pub Uuid);

impl UploadRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a completed upload turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Files are bundled into an image upload session.
    Image,
    /// A single user upload bound directly.
    File,
}

/// Content for one staging resource.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes { filename: String, content: Bytes },
    /// A file already on the platform, downloaded before it is staged again.
    Remote { url: String, filename: String },
}

impl UploadSource {
    /// Name registered with the platform.
    pub fn filename(&self) -> String {
        match self {
            UploadSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            UploadSource::Bytes { filename, .. } | UploadSource::Remote { filename, .. } => {
                filename.clone()
            }
        }
    }
}

/// Content that must be staged before its socket value can be bound.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub id: UploadRequestId,
    pub socket_slug: String,
    pub kind: UploadKind,
    pub sources: Vec<UploadSource>,
}

impl UploadRequest {
    pub fn new(socket_slug: impl Into<String>, kind: UploadKind, sources: Vec<UploadSource>) -> Self {
        Self {
            id: UploadRequestId::new(),
            socket_slug: socket_slug.into(),
            kind,
            sources,
        }
    }
}

/// Result of resolving one spec.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing to upload; the value can be sent as is.
    Resolved(ResolvedValue),
    /// Content must be uploaded first.
    Upload(UploadRequest),
}
