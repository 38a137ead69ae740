//! One logical upload.
//!
//! # Responsibilities
//! - Register a staging resource per source file
//! - Transfer content in parts through presigned URLs
//! - Signal completion and, for images, bundle uploads into a session
//!
//! # Data Flow
//! ```text
//! Pending
//!     → GET remote sources (platform files being re-staged)
//!     → POST uploads/ per source                            → Registered
//!     → per source, per part:
//!         PATCH generate-presigned-urls → PUT part → ETag   → Transferring
//!       PATCH complete-multipart-upload
//!     → Image: POST cases/upload-sessions/ {uploads}
//!     → binding (upload session or user upload URL)         → Completed
//! any unrecoverable error                                    → Failed
//! ```
//!
//! # Design Decisions
//! - Failure is terminal; only individual requests are retried by the executor
//! - Sources are transferred one after another within a session
//! - Remaining sources are abandoned after the first failure

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiRequest, RequestExecutor};
use crate::lifecycle::Cancellation;
use crate::observability::metrics;
use crate::sockets::{Binding, UploadKind, UploadRequest, UploadRequestId, UploadSource};
use crate::uploads::protocol::{self, CompletedPart, PresignedUrls, RawImageUploadSession, UserUpload};

/// Lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Queued, nothing sent yet.
    Pending,
    /// Every staging resource exists.
    Registered,
    /// Content is moving.
    Transferring,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Pending => "pending",
            SessionState::Registered => "registered",
            SessionState::Transferring => "transferring",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Callback invoked on every state transition.
pub type StateObserver = Arc<dyn Fn(UploadRequestId, SessionState) + Send + Sync>;

/// A source file paired with its staging resource.
#[derive(Debug, Clone)]
struct StagedSource {
    source: UploadSource,
    upload: UserUpload,
    parts: Vec<CompletedPart>,
}

/// Drives one upload request to completion.
pub struct UploadSession {
    request: UploadRequest,
    state: SessionState,
    staged: Vec<StagedSource>,
    bytes_transferred: u64,
    observer: Option<StateObserver>,
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("id", &self.request.id)
            .field("socket", &self.request.socket_slug)
            .field("state", &self.state)
            .field("bytes_transferred", &self.bytes_transferred)
            .finish()
    }
}

impl UploadSession {
    pub fn new(request: UploadRequest, observer: Option<StateObserver>) -> Self {
        Self {
            request,
            state: SessionState::Pending,
            staged: Vec::new(),
            bytes_transferred: 0,
            observer,
        }
    }

    pub fn id(&self) -> UploadRequestId {
        self.request.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Run the session. Any error leaves it `Failed`.
    pub async fn run(
        &mut self,
        executor: &RequestExecutor,
        chunk_size: u64,
        cancel: &Cancellation,
    ) -> ApiResult<Binding> {
        match self.drive(executor, chunk_size.max(1), cancel).await {
            Ok(binding) => {
                self.transition(SessionState::Completed);
                Ok(binding)
            }
            Err(err) => {
                self.transition(SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn drive(
        &mut self,
        executor: &RequestExecutor,
        chunk_size: u64,
        cancel: &Cancellation,
    ) -> ApiResult<Binding> {
        for source in self.request.sources.clone() {
            let source = fetch_remote(source, executor, cancel).await?;
            let filename = source.filename();
            let upload: UserUpload = executor
                .execute_json(&protocol::register(&filename), cancel)
                .await?;
            tracing::debug!(
                upload_id = %self.request.id,
                user_upload = %upload.pk,
                filename = %filename,
                "Registered user upload"
            );
            self.staged.push(StagedSource {
                source,
                upload,
                parts: Vec::new(),
            });
        }
        self.transition(SessionState::Registered);

        self.transition(SessionState::Transferring);
        for index in 0..self.staged.len() {
            self.transfer(index, executor, chunk_size, cancel).await?;
        }

        let upload_urls: Vec<String> = self
            .staged
            .iter()
            .map(|staged| staged.upload.api_url.clone())
            .collect();

        match self.request.kind {
            UploadKind::Image => {
                let session: RawImageUploadSession = executor
                    .execute_json(&protocol::create_image_session(&upload_urls), cancel)
                    .await?;
                Ok(Binding::UploadSession(session.api_url))
            }
            UploadKind::File => upload_urls
                .into_iter()
                .next()
                .map(Binding::UserUpload)
                .ok_or_else(|| ApiError::Decode("file upload produced no user upload".into())),
        }
    }

    async fn transfer(
        &mut self,
        index: usize,
        executor: &RequestExecutor,
        chunk_size: u64,
        cancel: &Cancellation,
    ) -> ApiResult<()> {
        let upload = self.staged[index].upload.clone();
        let mut reader = ChunkReader::open(&self.staged[index].source).await?;
        let mut part_number: u32 = 1;

        loop {
            let chunk = reader.next_chunk(chunk_size).await?;
            if chunk.is_empty() && part_number > 1 {
                break;
            }
            let chunk_len = chunk.len() as u64;

            let presigned: PresignedUrls = executor
                .execute_json(&protocol::presign(&upload, part_number), cancel)
                .await?;
            let url = presigned
                .presigned_urls
                .get(&part_number.to_string())
                .ok_or_else(|| {
                    ApiError::Decode(format!("no presigned URL for part {part_number}"))
                })?;
            let url = Url::parse(url).map_err(|e| ApiError::Decode(e.to_string()))?;

            let response = executor
                .execute(&ApiRequest::put_external(url, chunk), cancel)
                .await?;
            let etag = response
                .header("etag")
                .ok_or_else(|| ApiError::Decode(format!("part {part_number} has no ETag")))?
                .to_string();

            self.staged[index].parts.push(CompletedPart { etag, part_number });
            self.bytes_transferred += chunk_len;
            metrics::record_upload_bytes(chunk_len);

            if chunk_len < chunk_size {
                break;
            }
            part_number += 1;
        }

        let completed: UserUpload = executor
            .execute_json(&protocol::complete(&upload, &self.staged[index].parts), cancel)
            .await?;
        tracing::debug!(
            upload_id = %self.request.id,
            user_upload = %completed.pk,
            parts = self.staged[index].parts.len(),
            "Completed user upload"
        );
        self.staged[index].upload = completed;
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        self.state = next;
        if let Some(observer) = &self.observer {
            observer(self.request.id, next);
        }
    }
}

/// Download a remote source into memory; other sources pass through.
async fn fetch_remote(
    source: UploadSource,
    executor: &RequestExecutor,
    cancel: &Cancellation,
) -> ApiResult<UploadSource> {
    let (url, filename) = match source {
        UploadSource::Remote { url, filename } => (url, filename),
        other => return Ok(other),
    };
    let response = executor.execute(&ApiRequest::get_url(url.as_str()), cancel).await?;
    tracing::debug!(
        url = %url,
        filename = %filename,
        bytes = response.body.len(),
        "Downloaded file for re-upload"
    );
    Ok(UploadSource::Bytes {
        filename,
        content: response.body,
    })
}

/// Sequential part reader over a file or in-memory content.
enum ChunkReader {
    File { path: PathBuf, file: File },
    Memory { content: Bytes, offset: usize },
}

impl ChunkReader {
    async fn open(source: &UploadSource) -> ApiResult<Self> {
        match source {
            UploadSource::Path(path) => {
                let file = File::open(path).await.map_err(|source| ApiError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(ChunkReader::File {
                    path: path.clone(),
                    file,
                })
            }
            UploadSource::Bytes { content, .. } => Ok(ChunkReader::Memory {
                content: content.clone(),
                offset: 0,
            }),
            UploadSource::Remote { url, .. } => Err(ApiError::Decode(format!(
                "{url} must be downloaded before it is staged"
            ))),
        }
    }

    /// Up to `size` bytes; empty at the end.
    async fn next_chunk(&mut self, size: u64) -> ApiResult<Bytes> {
        match self {
            ChunkReader::File { path, file } => {
                let mut buf = BytesMut::with_capacity(size.min(8 * 1024 * 1024) as usize);
                let mut limited = (&mut *file).take(size);
                loop {
                    let read = limited.read_buf(&mut buf).await.map_err(|source| ApiError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    if read == 0 {
                        break;
                    }
                }
                Ok(buf.freeze())
            }
            ChunkReader::Memory { content, offset } => {
                let end = (*offset + size as usize).min(content.len());
                let chunk = content.slice(*offset..end);
                *offset = end;
                Ok(chunk)
            }
        }
    }
}
