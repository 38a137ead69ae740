//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gc_transfer::config::ClientConfig;
use gc_transfer::http::{ApiResponse, FnTransport, Transport, TransportRequest};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the raw TCP backend.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let url = url::Url::parse(&format!("http://backend{}", self.target)).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Start a programmable HTTP/1.1 backend on an ephemeral port.
///
/// The handler returns `(status, extra headers, body)` for each request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RawRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<(String, String)>, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, headers, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let mut head = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n",
                            status_text,
                            body.len()
                        );
                        for (name, value) in headers {
                            head.push_str(&format!("{name}: {value}\r\n"));
                        }
                        head.push_str("\r\n");

                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(body.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<RawRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RawRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Configuration pointing at a local plain-HTTP backend.
pub fn local_config(addr: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = format!("http://{addr}/api/v1/");
    config.api.allow_http = true;
    config.api.token = Some("test-token".into());
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config
}

/// Configuration for the scripted platform.
pub fn scripted_config(concurrency_bound: usize) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = "https://gc.test/api/v1/".into();
    config.uploads.concurrency_bound = concurrency_bound;
    config
}

/// In-process stand-in for the platform's staging and case endpoints.
///
/// Every call sleeps before answering: 100 ms for files whose name starts
/// with `slow`, 5 ms otherwise. Registrations of files named `bad*` are
/// rejected with a 400.
#[derive(Clone, Default)]
pub struct ScriptedPlatform {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        let calls = self.calls.clone();
        Arc::new(FnTransport::new(move |request: TransportRequest| {
            let path = request.url.path().to_string();
            calls
                .lock()
                .unwrap()
                .push(format!("{} {}", request.method, path));
            let body = request.json_body();
            async move {
                let name = upload_name(&path, body.as_ref());
                let delay = if name.starts_with("slow") { 100 } else { 5 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(respond(&path, body, &name))
            }
        }))
    }
}

/// The file name an upload call is about; the upload pk is the file name.
fn upload_name(path: &str, body: Option<&serde_json::Value>) -> String {
    if path == "/api/v1/uploads/" {
        return body
            .and_then(|b| b["filename"].as_str())
            .unwrap_or_default()
            .to_string();
    }
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["", "api", "v1", "uploads", pk, ..] => pk.to_string(),
        ["", "put", pk, ..] => pk.to_string(),
        _ => String::new(),
    }
}

fn respond(path: &str, body: Option<serde_json::Value>, name: &str) -> ApiResponse {
    if path == "/api/v1/uploads/" {
        if name.starts_with("bad") {
            return ApiResponse::new(400, "rejected");
        }
        return ApiResponse::json(
            201,
            &json!({
                "pk": name,
                "api_url": format!("https://gc.test/api/v1/uploads/{name}/"),
                "filename": name,
                "s3_upload_id": "s3",
                "status": "Initialized"
            }),
        );
    }
    if path.ends_with("/generate-presigned-urls/") {
        let part = body
            .as_ref()
            .and_then(|b| b["part_numbers"][0].as_u64())
            .unwrap_or(1);
        let mut urls = serde_json::Map::new();
        urls.insert(
            part.to_string(),
            json!(format!("https://s3.test/put/{name}/{part}")),
        );
        return ApiResponse::json(200, &json!({ "presigned_urls": urls }));
    }
    if path.starts_with("/media/") {
        return ApiResponse::new(200, "stored file content");
    }
    if path.starts_with("/put/") {
        return ApiResponse::new(200, "").with_header("ETag", "\"etag\"");
    }
    if path.ends_with("/complete-multipart-upload/") {
        return ApiResponse::json(
            200,
            &json!({
                "pk": name,
                "api_url": format!("https://gc.test/api/v1/uploads/{name}/"),
                "status": "Completed"
            }),
        );
    }
    if path == "/api/v1/cases/upload-sessions/" {
        let first = body
            .as_ref()
            .and_then(|b| b["uploads"][0].as_str())
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        return ApiResponse::json(
            201,
            &json!({
                "pk": first,
                "api_url": format!("https://gc.test/api/v1/cases/upload-sessions/{first}/"),
                "status": "Queued"
            }),
        );
    }
    if path == "/api/v1/archives/items/" {
        let values = body
            .as_ref()
            .map(|b| b["values"].clone())
            .unwrap_or_else(|| json!([]));
        return ApiResponse::json(
            201,
            &json!({
                "pk": "item-1",
                "api_url": "https://gc.test/api/v1/archives/items/item-1/",
                "values": values
            }),
        );
    }
    ApiResponse::new(404, "not found")
}
