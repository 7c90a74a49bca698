use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

use super::parse_params;
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::session::{LoadedDocument, Session};
use crate::utils::content_guard::safe_truncate_utf8;
use crate::utils::pdf::extract_document_text;
use crate::utils::pdf_source::{read_pdf_bytes, PdfSource};

pub const EXTRACTION_WARNING: &str =
    "Could not extract text from the PDF. Please ensure it's a valid, text-based PDF.";

pub static LOAD_PDF_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "load-pdf".to_string(),
    description: "Load a PDF document (from a local path or a URL) and extract its text so questions can be asked about it. Replaces any previously loaded document.".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "Path to a local PDF file"
            },
            "url": {
                "type": "string",
                "description": "HTTP(S) URL of a PDF file"
            },
            "previewLength": {
                "type": "integer",
                "description": "Number of characters of extracted text to echo back (default: 500)",
                "default": 500,
                "minimum": 0,
                "maximum": 5000
            }
        }
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Load PDF".to_string()),
        read_only_hint: Some(false),
        destructive_hint: Some(false),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct LoadPdfParams {
    path: Option<String>,
    url: Option<String>,
    #[serde(default = "default_preview_length", rename = "previewLength")]
    preview_length: usize,
}

fn default_preview_length() -> usize {
    500
}

pub struct LoadPdfTool;

impl LoadPdfTool {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        arguments: Option<serde_json::Value>,
        session: &mut Session,
    ) -> CallToolResult {
        let params = match parse_params::<LoadPdfParams>("load-pdf", arguments) {
            Ok(params) => params,
            Err(result) => return result,
        };

        let source = match (params.path, params.url) {
            (Some(path), None) if !path.trim().is_empty() => PdfSource::Path(PathBuf::from(path)),
            (None, Some(url)) => match url::Url::parse(&url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => PdfSource::Url(url),
                Ok(url) => {
                    return CallToolResult::error(format!(
                        "Unsupported URL scheme: {}",
                        url.scheme()
                    ))
                }
                Err(e) => return CallToolResult::error(format!("Invalid URL: {}", e)),
            },
            (Some(_), Some(_)) => {
                return CallToolResult::error("Provide either 'path' or 'url', not both")
            }
            _ => return CallToolResult::error("Missing required parameter: 'path' or 'url'"),
        };

        info!("Loading PDF from {}", source);

        let bytes = match read_pdf_bytes(&source).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to load PDF from {}", source);
                return CallToolResult::error(e.to_string());
            }
        };

        let extracted = extract_document_text(&bytes);
        let no_text = extracted.is_empty();
        let page_count = extracted.page_count;
        let char_count = extracted.text.chars().count();
        let preview = safe_truncate_utf8(extracted.text.trim(), params.preview_length, "...");

        session.load_document(LoadedDocument {
            source: source.to_string(),
            text: extracted.text,
            page_count,
        });

        if no_text {
            warn!("No text extracted from {}", source);
            return CallToolResult::error(EXTRACTION_WARNING);
        }

        let mut out = format!(
            "Loaded {}: {} page(s), {} characters extracted.",
            source, page_count, char_count
        );
        if !preview.is_empty() {
            out.push_str("\n---\nPreview:\n");
            out.push_str(&preview);
        }
        out.push_str("\n---\nUse ask-question to ask about this document.");
        CallToolResult::success(out)
    }
}
