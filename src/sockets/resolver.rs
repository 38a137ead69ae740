//! Socket value resolution.
//!
//! # Responsibilities
//! - Check a spec against the socket it targets
//! - Classify it as a direct value or content that must be uploaded
//! - Reject malformed specs before anything touches the network
//!
//! # Data Flow
//! ```text
//! SocketValueSpec + SocketCatalog
//!     → lookup socket (UnknownSocket)
//!     → exactly one source set (MultiplePayloads / NoPayload)
//!     → match (super kind, source):
//!         Value + value            → Resolved(Value)
//!         Value + existing value   → Resolved(Value)
//!         Image + files            → Upload(Image, n files)
//!         Image + existing image   → Resolved(Image)
//!         File  + one file         → Upload(File, 1 file)
//!         File  + object/array     → Upload(File, JSON bytes named relative_path)
//!         File  + existing upload  → Resolved(UserUpload)
//!         File  + existing value   → Upload(File, remote file re-staged)
//!         anything else            → ValidationError
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use bytes::Bytes;
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;
use crate::sockets::types::{
    Binding, ExistingReference, ExistingSocketValue, Resolution, ResolvedValue, Socket,
    SocketCatalog, SocketValueSpec, SuperKind, UploadKind, UploadRequest, UploadSource,
};

/// Resolve one spec against the catalog of its case target.
pub fn resolve(
    spec: &SocketValueSpec,
    catalog: &SocketCatalog,
) -> Result<Resolution, ValidationError> {
    let socket = catalog
        .get(&spec.socket_slug)
        .ok_or_else(|| ValidationError::UnknownSocket(spec.socket_slug.clone()))?;

    let sources = spec.set_sources();
    if sources.len() > 1 {
        return Err(ValidationError::MultiplePayloads {
            slug: socket.slug.clone(),
            sources: sources.join(", "),
        });
    }

    if let Some(files) = &spec.files {
        return resolve_files(socket, files);
    }
    if let Some(value) = &spec.value {
        return resolve_value(socket, value);
    }
    if let Some(existing) = &spec.existing {
        return resolve_existing(socket, existing);
    }

    Err(ValidationError::NoPayload(socket.slug.clone()))
}

/// Resolve every spec of one case, rejecting duplicate slugs first.
pub fn resolve_case(
    specs: &[SocketValueSpec],
    catalog: &SocketCatalog,
) -> Result<Vec<Resolution>, ValidationError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.socket_slug.as_str()) {
            return Err(ValidationError::DuplicateSocket(spec.socket_slug.clone()));
        }
    }

    specs.iter().map(|spec| resolve(spec, catalog)).collect()
}

fn resolve_files(socket: &Socket, files: &[PathBuf]) -> Result<Resolution, ValidationError> {
    let kind = match socket.super_kind {
        SuperKind::Value => return Err(ValidationError::FilesForValueSocket(socket.slug.clone())),
        SuperKind::Image => UploadKind::Image,
        SuperKind::File => UploadKind::File,
    };

    if files.is_empty() {
        return Err(ValidationError::NoFiles(socket.slug.clone()));
    }
    if kind == UploadKind::File && files.len() > 1 {
        return Err(ValidationError::TooManyFiles {
            slug: socket.slug.clone(),
            max: 1,
            got: files.len(),
        });
    }
    if let Some(missing) = files.iter().find(|path| !path.is_file()) {
        return Err(ValidationError::FileNotFound(missing.clone()));
    }

    let sources = files.iter().cloned().map(UploadSource::Path).collect();
    Ok(Resolution::Upload(UploadRequest::new(
        socket.slug.clone(),
        kind,
        sources,
    )))
}

fn resolve_value(socket: &Socket, value: &Value) -> Result<Resolution, ValidationError> {
    match socket.super_kind {
        SuperKind::Value => Ok(Resolution::Resolved(ResolvedValue::new(
            socket.slug.clone(),
            Binding::Value(value.clone()),
        ))),
        SuperKind::File if value.is_object() || value.is_array() => {
            let content =
                serde_json::to_vec(value).map_err(|e| ValidationError::NotSerializable {
                    slug: socket.slug.clone(),
                    reason: e.to_string(),
                })?;
            let filename = if socket.relative_path.is_empty() {
                format!("{}.json", socket.slug)
            } else {
                socket.relative_path.clone()
            };
            Ok(Resolution::Upload(UploadRequest::new(
                socket.slug.clone(),
                UploadKind::File,
                vec![UploadSource::Bytes {
                    filename,
                    content: Bytes::from(content),
                }],
            )))
        }
        super_kind => Err(ValidationError::ScalarForFileSocket {
            slug: socket.slug.clone(),
            super_kind: super_kind.to_string(),
        }),
    }
}

fn resolve_existing(
    socket: &Socket,
    existing: &ExistingReference,
) -> Result<Resolution, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidReference {
        slug: socket.slug.clone(),
        reason: reason.to_string(),
    };

    let binding = match (socket.super_kind, existing) {
        (SuperKind::Image, ExistingReference::Image(url)) => {
            Binding::Image(checked_url(socket, url)?)
        }
        (SuperKind::File, ExistingReference::UserUpload(url)) => {
            Binding::UserUpload(checked_url(socket, url)?)
        }
        (_, ExistingReference::SocketValue(existing_value)) => {
            return reuse_socket_value(socket, existing_value)
        }
        (SuperKind::Value, _) => return Err(invalid("value sockets only reuse socket values")),
        (SuperKind::Image, ExistingReference::UserUpload(_)) => {
            return Err(invalid("image sockets need an image, not a user upload"))
        }
        (SuperKind::File, ExistingReference::Image(_)) => {
            return Err(invalid("file sockets need a user upload, not an image"))
        }
    };

    Ok(Resolution::Resolved(ResolvedValue::new(
        socket.slug.clone(),
        binding,
    )))
}

fn reuse_socket_value(
    socket: &Socket,
    existing: &ExistingSocketValue,
) -> Result<Resolution, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidReference {
        slug: socket.slug.clone(),
        reason,
    };

    if existing.socket_slug != socket.slug {
        return Err(invalid(format!(
            "socket value belongs to {:?}",
            existing.socket_slug
        )));
    }

    let binding = match socket.super_kind {
        SuperKind::Image => match &existing.image {
            Some(url) => Binding::Image(checked_url(socket, url)?),
            None => return Err(invalid("socket value has no image".to_string())),
        },
        SuperKind::Value => match &existing.value {
            Some(value) => Binding::Value(value.clone()),
            None => return Err(invalid("socket value has no value".to_string())),
        },
        // Files cannot be linked across cases; the content is staged again.
        SuperKind::File => match &existing.file {
            Some(url) => return Ok(Resolution::Upload(restage_file(socket, url)?)),
            None => return Err(invalid("socket value has no file".to_string())),
        },
    };

    Ok(Resolution::Resolved(ResolvedValue::new(
        socket.slug.clone(),
        binding,
    )))
}

/// Upload request that downloads `url` and registers it under its own file name.
fn restage_file(socket: &Socket, url: &str) -> Result<UploadRequest, ValidationError> {
    let url = checked_url(socket, url)?;
    let filename = Url::parse(&url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| socket.relative_path.clone());

    Ok(UploadRequest::new(
        socket.slug.clone(),
        UploadKind::File,
        vec![UploadSource::Remote { url, filename }],
    ))
}

fn checked_url(socket: &Socket, raw: &str) -> Result<String, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidReference {
        slug: socket.slug.clone(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(format!("{raw:?} is not a URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("{raw:?} is not an http(s) URL")));
    }
    Ok(url.to_string())
}
