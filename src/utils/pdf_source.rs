use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::utils::content_guard::{build_error_payload, PDF_LIMIT_BYTES};
use crate::utils::pdf::is_pdf;

// Firefox ESR User-Agent string to reduce server-side variance
pub const FIREFOX_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:115.0) Gecko/20100101 Firefox/115.0";

// Local HTTP client with 30s timeout
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
});

/// Where a document is loaded from.
#[derive(Debug, Clone)]
pub enum PdfSource {
    Path(PathBuf),
    Url(url::Url),
}

impl std::fmt::Display for PdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfSource::Path(path) => write!(f, "{}", path.display()),
            PdfSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Reads the raw document bytes. Errors carry a standardized payload for the tool layer.
pub async fn read_pdf_bytes(source: &PdfSource) -> Result<Vec<u8>> {
    match source {
        PdfSource::Path(path) => read_from_path(path).await,
        PdfSource::Url(url) => fetch_from_url(url).await,
    }
}

async fn read_from_path(path: &Path) -> Result<Vec<u8>> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        warn!(target: "pdf_source", path = %path.display(), "Cannot stat file: {}", e);
        anyhow!(build_error_payload(
            "ERR_LOAD_FILE",
            "Could not open the PDF file",
            serde_json::json!({
                "path": path.display().to_string(),
                "error": e.to_string(),
            }),
        ))
    })?;

    if metadata.len() > PDF_LIMIT_BYTES {
        return Err(anyhow!(too_large_payload(&path.display().to_string(), metadata.len())));
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        anyhow!(build_error_payload(
            "ERR_LOAD_FILE",
            "Could not read the PDF file",
            serde_json::json!({
                "path": path.display().to_string(),
                "error": e.to_string(),
            }),
        ))
    })?;

    info!(target: "pdf_source", path = %path.display(), size = bytes.len(), "Read PDF from disk");
    Ok(bytes)
}

async fn fetch_from_url(url: &url::Url) -> Result<Vec<u8>> {
    info!(target: "pdf_source", url = %url, "Starting HTTP fetch");

    let response = HTTP_CLIENT
        .get(url.as_str())
        .header("User-Agent", FIREFOX_UA)
        .send()
        .await
        .map_err(|e| {
            warn!(target: "pdf_source", url = %url, "HTTP transport error: {}", e);
            anyhow!(build_error_payload(
                "ERR_FETCH_HTTP",
                "Network error during HTTP fetch",
                serde_json::json!({
                    "url": url.as_str(),
                    "hint": "Please verify the URL or try again later.",
                    "error": e.to_string()
                }),
            ))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let code_num = status.as_u16();
        let reason = status.canonical_reason().unwrap_or("Unknown error");
        warn!(target: "pdf_source", url = %url, status = code_num, "HTTP non-success status");
        return Err(anyhow!(build_error_payload(
            "ERR_FETCH_HTTP",
            &format!("HTTP error {}: {}", code_num, reason),
            serde_json::json!({
                "url": url.as_str(),
                "httpStatus": code_num,
                "reason": reason,
            }),
        )));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_string());

    if let Some(len) = response.content_length() {
        if len > PDF_LIMIT_BYTES {
            return Err(anyhow!(too_large_payload(url.as_str(), len)));
        }
    }

    let body = response.bytes().await.map_err(|e| {
        warn!(target: "pdf_source", url = %url, "Body read failed: {}", e);
        anyhow!(build_error_payload(
            "ERR_FETCH_HTTP",
            "Failed to read HTTP response body",
            serde_json::json!({
                "url": url.as_str(),
                "error": e.to_string()
            }),
        ))
    })?;

    if (body.len() as u64) > PDF_LIMIT_BYTES {
        return Err(anyhow!(too_large_payload(url.as_str(), body.len() as u64)));
    }

    let head = &body[..body.len().min(512)];
    if !is_pdf(content_type.as_deref(), head) {
        info!(target: "pdf_source", url = %url, ct = ?content_type, "Response is not a PDF; refusing");
        return Err(anyhow!(build_error_payload(
            "ERR_FETCH_NOT_PDF",
            "The URL did not return a PDF document",
            serde_json::json!({
                "url": url.as_str(),
                "contentType": content_type.unwrap_or_else(|| "unknown".to_string()),
                "size": body.len(),
            }),
        )));
    }

    info!(target: "pdf_source", url = %url, size = body.len(), "HTTP fetch completed");
    Ok(body.to_vec())
}

fn too_large_payload(source: &str, size: u64) -> String {
    build_error_payload(
        "ERR_LOAD_TOO_LARGE",
        "PDF exceeds the allowed size limit",
        serde_json::json!({
            "source": source,
            "size": size,
            "limit": PDF_LIMIT_BYTES,
        }),
    )
}
