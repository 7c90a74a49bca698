// PDF text extraction used by the load-pdf flow.
// Always keep this module small and dependency-light.

use anyhow::anyhow;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

/// Plain text pulled out of a loaded document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    /// All page texts concatenated in page order. Empty when nothing could be extracted.
    pub text: String,
    pub page_count: usize,
}

impl ExtractedDocument {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Extracts per-page text from a PDF stored fully in memory.
/// `pdf-extract` panics on some malformed inputs, so the call runs behind `catch_unwind`.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> anyhow::Result<Vec<String>> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(anyhow!("failed to extract text from PDF bytes: {}", e)),
        Err(_) => Err(anyhow!("PDF extraction panicked (malformed document)")),
    }
}

/// Best-effort extraction: never fails, returns empty text instead.
/// Non-PDF payloads, parse errors and image-only documents all end up as an empty string.
pub fn extract_document_text(bytes: &[u8]) -> ExtractedDocument {
    let head = &bytes[..bytes.len().min(512)];
    if !is_pdf(None, head) {
        warn!(target: "pdf", size = bytes.len(), "Payload does not carry a PDF signature");
        return ExtractedDocument::default();
    }

    match extract_text_from_pdf_mem(bytes) {
        Ok(pages) => {
            let page_count = pages.len();
            let text = pages.concat();
            if text.trim().is_empty() {
                warn!(target: "pdf", pages = page_count, "PDF has no extractable text layer");
                return ExtractedDocument {
                    text: String::new(),
                    page_count,
                };
            }
            info!(target: "pdf", pages = page_count, chars = text.chars().count(), "PDF extraction succeeded");
            ExtractedDocument { text, page_count }
        }
        Err(e) => {
            warn!(target: "pdf", "Error extracting text from PDF: {}", e);
            ExtractedDocument::default()
        }
    }
}

/// Returns true if given content-type or head indicates a PDF file.
/// - Content-Type: application/pdf (case-insensitive, substring match)
/// - Magic bytes: %PDF-
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}
