use once_cell::sync::Lazy;
use serde_json::json;

use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::session::Session;

pub static LIST_ANSWERS_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "list-answers".to_string(),
    description: "List the question/answer pairs saved in this session, numbered in the order they were saved".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {}
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Saved Answers".to_string()),
        read_only_hint: Some(true),
        destructive_hint: None,
        open_world_hint: Some(false),
    }),
});

pub struct ListAnswersTool;

impl ListAnswersTool {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, session: &Session) -> CallToolResult {
        let ledger = session.ledger();
        if ledger.is_empty() {
            return CallToolResult::success("No saved answers yet.");
        }
        CallToolResult::success(format!(
            "Saved Answers ({}):\n\n{}",
            ledger.len(),
            ledger.render()
        ))
    }
}
