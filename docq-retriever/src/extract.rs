//! Text extraction for non-plain-text sources via a Tika-compatible
//! server.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

/// Sources larger than this are refused rather than shipped to the
/// extraction server.
const MAX_SOURCE_BYTES: u64 = 50 * 1024 * 1024;

/// Client for a Tika-style `PUT /tika` plain-text extraction endpoint.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    base_url: String,
    http: reqwest::Client,
}

impl TextExtractor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building extraction http client")?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, http })
    }

    /// Uploads the file body and returns the extracted plain text.
    pub async fn extract(&self, path: &Path) -> anyhow::Result<String> {
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("stat {}", path.display()))?;
        anyhow::ensure!(
            meta.len() <= MAX_SOURCE_BYTES,
            "{} is {} bytes, over the {} byte extraction limit",
            path.display(),
            meta.len(),
            MAX_SOURCE_BYTES
        );

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "extracting text");

        let response = self
            .http
            .put(format!("{}/tika", self.base_url))
            .header(reqwest::header::ACCEPT, "text/plain")
            .header(reqwest::header::CONTENT_TYPE, content_type_for(path))
            .body(bytes)
            .send()
            .await
            .context("extraction request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("extraction server returned {status}: {detail}");
        }
        response.text().await.context("reading extraction response")
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("html") | Some("htm") => "text/html",
        Some("txt") | Some("md") => "text/plain",
        _ => "application/octet-stream",
    }
}
