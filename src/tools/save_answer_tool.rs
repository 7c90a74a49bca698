use once_cell::sync::Lazy;
use serde_json::json;
use tracing::{info, warn};

use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::session::Session;

pub static SAVE_ANSWER_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "save-answer".to_string(),
    description: "Save the most recent answer (and its question) to this session's saved answers. Failed answers cannot be saved.".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {}
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Save this Answer".to_string()),
        read_only_hint: Some(false),
        destructive_hint: Some(false),
        open_world_hint: Some(false),
    }),
});

pub struct SaveAnswerTool;

impl SaveAnswerTool {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, session: &mut Session) -> CallToolResult {
        match session.save_pending() {
            Ok(record) => {
                info!("Saved answer for \"{}\"", record.question_or_placeholder());
                CallToolResult::success(format!(
                    "Answer saved! ({} saved answer(s) in this session)",
                    session.ledger().len()
                ))
            }
            Err(e) => {
                warn!("Refused to save answer: {}", e);
                CallToolResult::error(e.to_string())
            }
        }
    }
}
