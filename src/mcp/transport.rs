use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error};

use super::types::{
    McpMessage, McpNotification, McpRequest, McpResponse, INVALID_REQUEST, PARSE_ERROR,
};

/// Newline-delimited JSON-RPC over any async byte pipe.
pub struct LineTransport<R, W> {
    reader: FramedRead<BufReader<R>, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(BufReader::new(reader), LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// Reads the next message; `Ok(None)` means the peer closed the stream.
    pub async fn read_message(&mut self) -> Result<Option<McpMessage>> {
        let line = match self.reader.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                error!("Error reading from input: {}", e);
                return Err(anyhow!("Transport error: {}", e));
            }
            None => {
                debug!("EOF reached");
                return Ok(None);
            }
        };

        debug!("Received: {}", line);
        Ok(Some(parse_message(&line)))
    }

    pub async fn write_response(&mut self, response: McpResponse) -> Result<()> {
        let json = serde_json::to_string(&response)?;
        debug!("Sending: {}", json);

        self.writer.send(json).await?;

        Ok(())
    }
}

/// Classifies one line: objects with an `id` are requests, the rest notifications.
/// Anything unusable becomes `McpMessage::Malformed` so the caller can answer it.
fn parse_message(line: &str) -> McpMessage {
    let value = match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse JSON: {}", e);
            return McpMessage::Malformed {
                id: serde_json::Value::Null,
                code: PARSE_ERROR,
                message: format!("Parse error: {}", e),
            };
        }
    };

    let id = match value.as_object() {
        Some(obj) => obj.get("id").cloned(),
        None => {
            error!("Invalid JSON-RPC message structure");
            return McpMessage::Malformed {
                id: serde_json::Value::Null,
                code: INVALID_REQUEST,
                message: "Invalid Request: expected a JSON object".to_string(),
            };
        }
    };

    let parsed = match id {
        Some(_) => serde_json::from_value::<McpRequest>(value).map(McpMessage::Request),
        None => serde_json::from_value::<McpNotification>(value).map(McpMessage::Notification),
    };

    parsed.unwrap_or_else(|e| {
        error!("Failed to parse JSON-RPC message: {}", e);
        McpMessage::Malformed {
            id: id.unwrap_or(serde_json::Value::Null),
            code: INVALID_REQUEST,
            message: format!("Invalid Request: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_requests_and_notifications() {
        let request = parse_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        assert!(matches!(request, McpMessage::Request(ref r) if r.method == "ping"));

        let notification =
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(matches!(notification, McpMessage::Notification(_)));
    }

    #[test]
    fn unusable_lines_are_reported_as_malformed() {
        assert!(matches!(
            parse_message("{not json"),
            McpMessage::Malformed { id: serde_json::Value::Null, code: PARSE_ERROR, .. }
        ));
        assert!(matches!(
            parse_message("[1,2,3]"),
            McpMessage::Malformed { id: serde_json::Value::Null, code: INVALID_REQUEST, .. }
        ));
        match parse_message(r#"{"jsonrpc":"2.0","id":4}"#) {
            McpMessage::Malformed { id, code, .. } => {
                assert_eq!(id, serde_json::json!(4));
                assert_eq!(code, INVALID_REQUEST);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn reads_lines_until_eof() {
        let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n";
        let mut transport = LineTransport::new(input, Vec::new());

        assert!(matches!(
            transport.read_message().await.expect("read"),
            Some(McpMessage::Request(_))
        ));
        assert!(transport.read_message().await.expect("eof").is_none());
    }
}
