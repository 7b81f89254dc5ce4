//! Append-only request dump file.
//!
//! When enabled, each inbound registration request is written out in
//! HTTP/1.x wire form, framed by a banner line, so an operator can replay
//! or eyeball exactly what subscribers sent. Write failures are logged and
//! never affect the response.

use std::path::{Path, PathBuf};

use axum::http::request::Parts;
use tokio::io::AsyncWriteExt;

const BANNER: &str = "----- New Request -----\n";

/// Renders a request like `httputil.DumpRequest`-style wire text.
pub fn format_request(parts: &Parts, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(BANNER.len() + 256 + body.len());
    out.extend_from_slice(BANNER.as_bytes());
    out.extend_from_slice(
        format!("{} {} {:?}\r\n", parts.method, parts.uri, parts.version).as_bytes(),
    );
    for (name, value) in &parts.headers {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out.extend_from_slice(b"\n\n");
    out
}

/// File sink for request dumps.
#[derive(Debug, Clone)]
pub struct RequestLog {
    path: PathBuf,
}

impl RequestLog {
    /// Creates a sink appending to `path` (created on first write).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the dump file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one request dump.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub async fn append(&self, parts: &Parts, body: &[u8]) -> std::io::Result<()> {
        let dump = format_request(parts, body);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&dump).await?;
        file.flush().await
    }

    /// Appends one request dump, logging instead of failing.
    pub async fn record(&self, parts: &Parts, body: &[u8]) {
        if let Err(e) = self.append(parts, body).await {
            log::warn!(
                "Failed to write request log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
