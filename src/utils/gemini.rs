use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub const NO_DOCUMENT_MESSAGE: &str =
    "PDF content is empty or could not be extracted. Cannot ask questions.";
pub const EMPTY_ANSWER_MESSAGE: &str =
    "Gemini returned an empty answer. Please try a different question or PDF content.";
pub const FAILED_ANSWER_MESSAGE: &str = "Could not get an answer from the AI. Please check your API key, model name, internet connection, or try again later.";

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gemini returned no candidates (block reason: {})", .0.as_deref().unwrap_or("none"))]
    NoCandidates(Option<String>),

    #[error("Gemini returned a candidate without text (finish reason: {})", .0.as_deref().unwrap_or("none"))]
    NoContent(Option<String>),

    #[error("Malformed Gemini response: {0}")]
    InvalidResponse(String),
}

/// Result of asking one question about one document.
#[derive(Debug)]
pub enum AnswerOutcome {
    /// Trimmed, non-empty model output.
    Answered(String),
    /// The call succeeded but the model produced no text.
    EmptyAnswer,
    /// There was no document text to ask about; no request was made.
    NoDocument,
    Failed(AnswerError),
}

impl AnswerOutcome {
    /// Text shown to the user: the answer itself or the matching sentinel message.
    pub fn text(&self) -> &str {
        match self {
            AnswerOutcome::Answered(text) => text,
            AnswerOutcome::EmptyAnswer => EMPTY_ANSWER_MESSAGE,
            AnswerOutcome::NoDocument => NO_DOCUMENT_MESSAGE,
            AnswerOutcome::Failed(_) => FAILED_ANSWER_MESSAGE,
        }
    }

    pub fn is_saveable(&self) -> bool {
        matches!(self, AnswerOutcome::Answered(_) | AnswerOutcome::EmptyAnswer)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Builds the single prompt sent for every question.
pub fn build_prompt(text: &str, question: &str) -> String {
    format!("PDF Content:\n{}\n\nQuestion: {}\nAnswer:", text, question)
}

/// Thin client over the Gemini `generateContent` endpoint. One attempt per call.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .user_agent(concat!("mcp-pdfask/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Answers `question` using `text` as context.
    /// Empty text short-circuits without touching the network.
    pub async fn answer(&self, text: &str, question: &str) -> AnswerOutcome {
        if text.trim().is_empty() {
            return AnswerOutcome::NoDocument;
        }

        let prompt = build_prompt(text, question);
        info!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "Asking Gemini"
        );

        match self.generate(&prompt).await {
            Ok(answer) => {
                let answer = answer.trim();
                if answer.is_empty() {
                    warn!("Gemini returned an empty answer");
                    AnswerOutcome::EmptyAnswer
                } else {
                    AnswerOutcome::Answered(answer.to_string())
                }
            }
            Err(e) => {
                warn!("Error calling Gemini API: {}", e);
                AnswerOutcome::Failed(e)
            }
        }
    }

    /// Sends one prompt and returns the raw completion text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AnswerError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&response_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(response_text);
            return Err(AnswerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Received response from Gemini API: {}", response_text);

        let parsed = serde_json::from_str::<GenerateContentResponse>(&response_text)
            .map_err(|e| AnswerError::InvalidResponse(e.to_string()))?;

        let candidate = match parsed.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = parsed.prompt_feedback.and_then(|f| f.block_reason);
                return Err(AnswerError::NoCandidates(reason));
            }
        };

        // No text part at all means the reply was blocked or cut off.
        let texts: Vec<String> = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();
        if texts.is_empty() {
            return Err(AnswerError::NoContent(candidate.finish_reason));
        }
        Ok(texts.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "test-key".into(),
            model: "gemini-test".into(),
            api_base: server.base_url(),
        })
    }

    #[tokio::test]
    async fn returns_trimmed_answer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("x-goog-api-key", "test-key")
                    .body_contains("Question: What is X?");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "  X is Y.\n" }], "role": "model" }
                    }]
                }));
            })
            .await;

        let outcome = client_for(&server).answer("X is Y in this text.", "What is X?").await;

        mock.assert_async().await;
        assert!(matches!(outcome, AnswerOutcome::Answered(ref a) if a == "X is Y."));
        assert!(outcome.is_saveable());
    }

    #[tokio::test]
    async fn empty_text_skips_network_call() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let outcome = client_for(&server).answer("  \n\t", "Anything?").await;

        mock.assert_hits_async(0).await;
        assert!(matches!(outcome, AnswerOutcome::NoDocument));
        assert_eq!(outcome.text(), NO_DOCUMENT_MESSAGE);
    }

    #[tokio::test]
    async fn empty_completion_maps_to_empty_sentinel() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
                }));
            })
            .await;

        let outcome = client_for(&server).answer("some text", "q").await;

        assert!(matches!(outcome, AnswerOutcome::EmptyAnswer));
        assert_eq!(outcome.text(), EMPTY_ANSWER_MESSAGE);
    }

    #[tokio::test]
    async fn api_error_maps_to_failure_sentinel() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(400).json_body(json!({
                    "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
                }));
            })
            .await;

        let outcome = client_for(&server).answer("some text", "q").await;

        match &outcome {
            AnswerOutcome::Failed(AnswerError::Api { status, message }) => {
                assert_eq!(*status, 400);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcome.text(), FAILED_ANSWER_MESSAGE);
        assert!(!outcome.is_saveable());
    }

    #[tokio::test]
    async fn blocked_prompt_is_a_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "promptFeedback": { "blockReason": "SAFETY" }
                }));
            })
            .await;

        let err = client_for(&server)
            .generate("prompt")
            .await
            .expect_err("blocked");

        assert!(matches!(err, AnswerError::NoCandidates(Some(ref r)) if r == "SAFETY"));
    }

    #[tokio::test]
    async fn candidate_without_content_is_a_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "candidates": [{ "finishReason": "SAFETY", "safetyRatings": [] }]
                }));
            })
            .await;

        let outcome = client_for(&server).answer("some text", "q").await;

        assert!(matches!(
            outcome,
            AnswerOutcome::Failed(AnswerError::NoContent(Some(ref r))) if r == "SAFETY"
        ));
        assert_eq!(outcome.text(), FAILED_ANSWER_MESSAGE);
        assert!(!outcome.is_saveable());
    }

    #[tokio::test]
    async fn candidate_with_empty_parts_is_a_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [] }, "finishReason": "RECITATION" }]
                }));
            })
            .await;

        let err = client_for(&server)
            .generate("prompt")
            .await
            .expect_err("no parts");

        assert!(matches!(err, AnswerError::NoContent(Some(ref r)) if r == "RECITATION"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_failure() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            model: "m".into(),
            api_base: "http://127.0.0.1:9".into(),
        });

        let outcome = client.answer("text", "q").await;
        assert!(matches!(outcome, AnswerOutcome::Failed(AnswerError::Request(_))));
    }

    #[test]
    fn prompt_embeds_text_and_question() {
        assert_eq!(
            build_prompt("Body", "Why?"),
            "PDF Content:\nBody\n\nQuestion: Why?\nAnswer:"
        );
    }
}
