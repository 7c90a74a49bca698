use once_cell::sync::Lazy;
use serde_json::json;
use tracing::info;

use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::session::Session;

pub static CLEAR_ANSWERS_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "clear-answers".to_string(),
    description: "Remove every saved question/answer pair from this session".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {}
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Clear All Saved Answers".to_string()),
        read_only_hint: Some(false),
        destructive_hint: Some(true),
        open_world_hint: Some(false),
    }),
});

pub struct ClearAnswersTool;

impl ClearAnswersTool {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, session: &mut Session) -> CallToolResult {
        let removed = session.clear_ledger();
        info!(removed, "Saved answers cleared");
        CallToolResult::success(format!("Saved answers cleared ({} removed).", removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::gemini::AnswerOutcome;

    #[test]
    fn clears_everything() {
        let mut session = Session::new();
        for q in ["a", "b"] {
            session.set_pending(q.into(), AnswerOutcome::Answered("x".into()));
            session.save_pending().expect("saved");
        }

        let result = ClearAnswersTool::new().execute(&mut session);
        assert!(result.text().contains("2 removed"));
        assert_eq!(session.ledger().len(), 0);
    }
}
