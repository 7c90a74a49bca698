pub mod ask_question_tool;
pub mod clear_answers_tool;
pub mod export_answers_tool;
pub mod list_answers_tool;
pub mod load_pdf_tool;
pub mod save_answer_tool;

use serde::de::DeserializeOwned;
use tracing::error;

use crate::mcp::types::CallToolResult;

/// Decodes tool arguments, turning failures into a tool error result.
/// Tools without required arguments accept a missing `arguments` object.
pub(crate) fn parse_params<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<serde_json::Value>,
) -> Result<T, CallToolResult> {
    let args = arguments.unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value::<T>(args).map_err(|e| {
        error!("Invalid {} parameters: {}", tool, e);
        CallToolResult::error(format!("Invalid parameters: {}", e))
    })
}
