//! Wire shapes of the staging upload endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::ApiRequest;

/// A server-side staging resource for one file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UserUpload {
    pub pk: String,
    pub api_url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub s3_upload_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response to a presign call: part number (as a string key) to URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedUrls {
    pub presigned_urls: HashMap<String, String>,
}

/// One transferred part, as reported back on completion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletedPart {
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
}

/// A raw image upload session bundling several user uploads into one image.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RawImageUploadSession {
    pub pk: String,
    pub api_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

pub const UPLOADS_PATH: &str = "uploads/";
pub const IMAGE_SESSIONS_PATH: &str = "cases/upload-sessions/";

pub fn register(filename: &str) -> ApiRequest {
    ApiRequest::post(UPLOADS_PATH, json!({ "filename": filename }))
}

pub fn presign(upload: &UserUpload, part_number: u32) -> ApiRequest {
    ApiRequest::patch(
        format!(
            "{UPLOADS_PATH}{}/{}/generate-presigned-urls/",
            upload.pk, upload.s3_upload_id
        ),
        json!({ "part_numbers": [part_number] }),
    )
}

pub fn complete(upload: &UserUpload, parts: &[CompletedPart]) -> ApiRequest {
    ApiRequest::patch(
        format!(
            "{UPLOADS_PATH}{}/{}/complete-multipart-upload/",
            upload.pk, upload.s3_upload_id
        ),
        json!({ "parts": parts }),
    )
}

pub fn create_image_session(upload_urls: &[String]) -> ApiRequest {
    ApiRequest::post(IMAGE_SESSIONS_PATH, json!({ "uploads": upload_urls }))
}
