//! Stdio transport — reads newline-delimited JSON from stdin, writes to
//! stdout. One stdio connection is one session.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

const STDIO_SESSION_ID: &str = "stdio";

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Run the transport loop until EOF on stdin.
    pub async fn run(&self) -> McpResult<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        tracing::info!("Stdio transport started");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(McpError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            if line.trim().is_empty() {
                continue;
            }

            let response = match framing::parse_line(&line) {
                Ok(raw) => self.handler.handle_message(raw, STDIO_SESSION_ID).await,
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    Some(e.to_response(None))
                }
            };

            if let Some(response) = response {
                let framed = framing::frame_message(&response)?;
                stdout
                    .write_all(framed.as_bytes())
                    .await
                    .map_err(McpError::Io)?;
                stdout.flush().await.map_err(McpError::Io)?;
            }
        }

        Ok(())
    }
}
