use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::transport::LineTransport;
use super::types::*;
use crate::session::Session;
use crate::tools::{
    ask_question_tool::{AskQuestionTool, ASK_QUESTION_TOOL_DEFINITION},
    clear_answers_tool::{ClearAnswersTool, CLEAR_ANSWERS_TOOL_DEFINITION},
    export_answers_tool::{ExportAnswersTool, EXPORT_ANSWERS_TOOL_DEFINITION},
    list_answers_tool::{ListAnswersTool, LIST_ANSWERS_TOOL_DEFINITION},
    load_pdf_tool::{LoadPdfTool, LOAD_PDF_TOOL_DEFINITION},
    save_answer_tool::{SaveAnswerTool, SAVE_ANSWER_TOOL_DEFINITION},
};
use crate::utils::gemini::{GeminiClient, GeminiConfig};

/// Serves one client session. Requests are handled strictly in order; the
/// session state lives here and is handed to each tool call.
pub struct McpServer {
    gemini: GeminiClient,
    session: Session,
    initialized: bool,
}

impl McpServer {
    pub fn new(gemini_config: GeminiConfig) -> Self {
        Self {
            gemini: GeminiClient::new(gemini_config),
            session: Session::new(),
            initialized: false,
        }
    }

    pub async fn start<R, W>(&mut self, mut transport: LineTransport<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP server started and listening");

        loop {
            match transport.read_message().await? {
                Some(message) => match message {
                    McpMessage::Request(request) => {
                        let response = self.handle_request(request).await;
                        transport.write_response(response).await?;
                    }
                    McpMessage::Notification(notification) => {
                        self.handle_notification(notification);
                    }
                    McpMessage::Malformed { id, code, message } => {
                        warn!("Rejected malformed message: {}", message);
                        transport
                            .write_response(McpResponse::failure(id, code, message))
                            .await?;
                    }
                },
                None => {
                    info!("Client disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_request(&mut self, request: McpRequest) -> McpResponse {
        let id = Self::ensure_valid_id(request.id.clone());

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "ping" => McpResponse::success(id, serde_json::json!({})),
            _ => McpResponse::failure(id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    fn handle_notification(&mut self, notification: McpNotification) {
        debug!("Received notification: {}", notification.method);

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialization completed");
                self.initialized = true;
            }
            "notifications/cancelled" => {
                debug!("Request cancelled notification received");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    fn ensure_valid_id(id: Option<serde_json::Value>) -> serde_json::Value {
        match id {
            Some(serde_json::Value::Null) | None => serde_json::Value::String("0".to_string()),
            Some(value) => value,
        }
    }

    fn handle_initialize(
        &mut self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(params) => params,
            None => return McpResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        let init_params = match serde_json::from_value::<InitializeParams>(params) {
            Ok(init_params) => init_params,
            Err(e) => {
                return McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e))
            }
        };

        info!(
            client = %init_params.client_info.name,
            version = %init_params.client_info.version,
            "Starting new session"
        );
        // A (re)initialize starts a fresh session.
        self.session.reset();
        self.initialized = false;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: ServerInfo {
                name: "PDF Q&A with Google Gemini".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "Load a PDF, ask Gemini questions about it, save answers and export them as a PDF"
                        .to_string(),
                ),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                logging: Some(serde_json::json!({})),
            },
        };

        McpResponse::success(id, serde_json::json!(result))
    }

    fn handle_list_tools(&self, id: serde_json::Value) -> McpResponse {
        let result = ListToolsResult {
            tools: vec![
                LOAD_PDF_TOOL_DEFINITION.clone(),
                ASK_QUESTION_TOOL_DEFINITION.clone(),
                SAVE_ANSWER_TOOL_DEFINITION.clone(),
                LIST_ANSWERS_TOOL_DEFINITION.clone(),
                CLEAR_ANSWERS_TOOL_DEFINITION.clone(),
                EXPORT_ANSWERS_TOOL_DEFINITION.clone(),
            ],
        };

        McpResponse::success(id, serde_json::json!(result))
    }

    async fn handle_call_tool(
        &mut self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(params) => params,
            None => return McpResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        match serde_json::from_value::<CallToolParams>(params) {
            Ok(call_params) => {
                let name = call_params.name.clone();
                let result = self.execute_tool(call_params).await;
                if result.is_error() {
                    warn!(tool = %name, "Tool reported an error: {}", result.text());
                }
                McpResponse::success(id, serde_json::json!(result))
            }
            Err(e) => McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    async fn execute_tool(&mut self, params: CallToolParams) -> CallToolResult {
        debug!("Calling tool {}", params.name);
        if !self.initialized {
            debug!("Tool called before the client confirmed initialization");
        }

        match params.name.as_str() {
            "load-pdf" => {
                let tool = LoadPdfTool::new();
                tool.execute(params.arguments, &mut self.session).await
            }
            "ask-question" => {
                let tool = AskQuestionTool::new(&self.gemini);
                tool.execute(params.arguments, &mut self.session).await
            }
            "save-answer" => SaveAnswerTool::new().execute(&mut self.session),
            "list-answers" => ListAnswersTool::new().execute(&self.session),
            "clear-answers" => ClearAnswersTool::new().execute(&mut self.session),
            "export-answers" => {
                let tool = ExportAnswersTool::new();
                tool.execute(params.arguments, &self.session).await
            }
            _ => CallToolResult::error(format!("Tool not found: {}", params.name)),
        }
    }
}
