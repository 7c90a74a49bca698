use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::parse_params;
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::session::Session;
use crate::utils::gemini::{AnswerOutcome, GeminiClient};

pub static ASK_QUESTION_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "ask-question".to_string(),
    description: "Ask Google Gemini a natural-language question about the loaded PDF. The answer is kept as the pending answer until the next question; use save-answer to keep it.".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "question": {
                "type": "string",
                "description": "The question about the PDF content"
            }
        },
        "required": ["question"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Ask a Question".to_string()),
        read_only_hint: Some(false),
        destructive_hint: Some(false),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct AskQuestionParams {
    question: String,
}

pub struct AskQuestionTool<'a> {
    client: &'a GeminiClient,
}

impl<'a> AskQuestionTool<'a> {
    pub fn new(client: &'a GeminiClient) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        arguments: Option<serde_json::Value>,
        session: &mut Session,
    ) -> CallToolResult {
        let params = match arguments {
            Some(args) => match parse_params::<AskQuestionParams>("ask-question", Some(args)) {
                Ok(params) => params,
                Err(result) => return result,
            },
            None => return CallToolResult::error("Missing required parameters"),
        };

        let question = params.question.trim().to_string();
        if question.is_empty() {
            return CallToolResult::error("The question must not be empty");
        }

        let text = match session.document() {
            Some(doc) => {
                info!(
                    source = %doc.source,
                    pages = doc.page_count,
                    "Asking about the loaded PDF: \"{}\"",
                    question
                );
                doc.text.clone()
            }
            None => return CallToolResult::error("No PDF loaded. Use load-pdf first."),
        };

        if let Some(previous) = session.pending() {
            debug!("Discarding unsaved answer for \"{}\"", previous.question);
        }

        let outcome = self.client.answer(&text, &question).await;
        let pending = session.set_pending(question, outcome);

        match &pending.outcome {
            AnswerOutcome::Answered(_) | AnswerOutcome::EmptyAnswer => CallToolResult::success(
                format!(
                    "{}\n---\nModel: {}\nUse save-answer to keep this answer.",
                    pending.outcome.text(),
                    self.client.model()
                ),
            ),
            AnswerOutcome::NoDocument => {
                warn!("Question asked against a document without text");
                CallToolResult::error(pending.outcome.text())
            }
            AnswerOutcome::Failed(e) => CallToolResult::error(format!(
                "{}\n---\nCause: {}",
                pending.outcome.text(),
                e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoadedDocument;
    use crate::utils::gemini::{GeminiConfig, FAILED_ANSWER_MESSAGE, NO_DOCUMENT_MESSAGE};
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "key".into(),
            model: "gemini-test".into(),
            api_base: server.base_url(),
        })
    }

    fn session_with(text: &str) -> Session {
        let mut session = Session::new();
        session.load_document(LoadedDocument {
            source: "doc.pdf".into(),
            text: text.into(),
            page_count: 1,
        });
        session
    }

    #[tokio::test]
    async fn answer_becomes_pending() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/gemini-test:generateContent");
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "X is Y." }] } }]
                }));
            })
            .await;
        let client = client_for(&server);
        let mut session = session_with("X is Y.");

        let result = AskQuestionTool::new(&client)
            .execute(Some(json!({ "question": " What is X? " })), &mut session)
            .await;

        assert!(!result.is_error());
        assert!(result.text().starts_with("X is Y."));
        let pending = session.pending().expect("pending");
        assert_eq!(pending.question, "What is X?");
    }

    #[tokio::test]
    async fn failure_is_reported_and_not_saveable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1beta/models/gemini-test:generateContent");
                then.status(429).body("quota exceeded");
            })
            .await;
        let client = client_for(&server);
        let mut session = session_with("Some content");

        let result = AskQuestionTool::new(&client)
            .execute(Some(json!({ "question": "Why?" })), &mut session)
            .await;

        assert!(result.is_error());
        assert!(result.text().starts_with(FAILED_ANSWER_MESSAGE));
        assert!(session.save_pending().is_err());
        assert!(session.ledger().is_empty());
    }

    #[tokio::test]
    async fn empty_document_never_calls_the_service() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;
        let client = client_for(&server);
        let mut session = session_with("");

        let result = AskQuestionTool::new(&client)
            .execute(Some(json!({ "question": "Anything?" })), &mut session)
            .await;

        mock.assert_hits_async(0).await;
        assert!(result.is_error());
        assert_eq!(result.text(), NO_DOCUMENT_MESSAGE);
    }

    #[tokio::test]
    async fn requires_document_and_question() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);
        let mut session = Session::new();
        let tool = AskQuestionTool::new(&client);

        let no_doc = tool
            .execute(Some(json!({ "question": "Hello?" })), &mut session)
            .await;
        assert!(no_doc.text().contains("No PDF loaded"));

        let mut session = session_with("text");
        let blank = tool
            .execute(Some(json!({ "question": "   " })), &mut session)
            .await;
        assert!(blank.is_error());
        assert!(tool.execute(None, &mut session).await.is_error());
    }
}
