use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, error, info, warn};

use super::parse_params;
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::session::Session;
use crate::utils::content_guard::build_error_payload;
use crate::utils::pdf_export::export_answers_to_pdf;

pub const DEFAULT_EXPORT_FILE: &str = "saved_answers.pdf";

pub static EXPORT_ANSWERS_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "export-answers".to_string(),
    description: "Export all saved question/answer pairs as a PDF document written to the given path".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "outputPath": {
                "type": "string",
                "description": "Where to write the PDF (default: saved_answers.pdf in the working directory)",
                "default": DEFAULT_EXPORT_FILE
            }
        }
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Export All as PDF".to_string()),
        read_only_hint: Some(false),
        destructive_hint: Some(true),
        open_world_hint: Some(false),
    }),
});

#[derive(Debug, Deserialize)]
struct ExportAnswersParams {
    #[serde(default = "default_output_path", rename = "outputPath")]
    output_path: String,
}

fn default_output_path() -> String {
    DEFAULT_EXPORT_FILE.to_string()
}

pub struct ExportAnswersTool;

impl ExportAnswersTool {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        arguments: Option<serde_json::Value>,
        session: &Session,
    ) -> CallToolResult {
        let params = match parse_params::<ExportAnswersParams>("export-answers", arguments) {
            Ok(params) => params,
            Err(result) => return result,
        };

        let records = session.ledger().records();
        if records.is_empty() {
            return CallToolResult::error("No saved answers to export.");
        }

        let destination = PathBuf::from(params.output_path.trim());
        if destination.as_os_str().is_empty() {
            return CallToolResult::error("outputPath must not be empty");
        }

        let temp = match export_answers_to_pdf(records) {
            Ok(temp) => temp,
            Err(e) => {
                error!("Failed to render saved answers: {}", e);
                return CallToolResult::error(build_error_payload(
                    "ERR_EXPORT_RENDER",
                    "Could not generate the PDF",
                    json!({ "error": e.to_string() }),
                ));
            }
        };

        match deliver_export(temp, &destination).await {
            Ok(size) => {
                info!(path = %destination.display(), size, "Saved answers exported");
                CallToolResult::success(format!(
                    "Exported {} saved answer(s) to {} ({} bytes).",
                    records.len(),
                    destination.display(),
                    size
                ))
            }
            Err(e) => {
                warn!(path = %destination.display(), "Failed to write export: {}", e);
                CallToolResult::error(build_error_payload(
                    "ERR_EXPORT_WRITE",
                    "Could not write the exported PDF",
                    json!({
                        "path": destination.display().to_string(),
                        "error": e.to_string(),
                    }),
                ))
            }
        }
    }
}

/// Copies the rendered export to `destination`, then removes the temp file
/// whatever the outcome of the copy.
async fn deliver_export(temp: TempPath, destination: &Path) -> std::io::Result<u64> {
    let delivered = tokio::fs::copy(&temp, destination).await;
    debug!(temp = %temp.display(), "Removing temporary export file");
    if let Err(e) = temp.close() {
        warn!("Failed to remove temporary export file: {}", e);
    }
    delivered
}
