//! Tool: echo — return the message it was given.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use agentic_gateway::{JobExecutor, ProgressReporter};

use super::registry::ToolSpec;

#[derive(Debug, Deserialize)]
struct EchoParams {
    message: String,
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        tool_id: "echo".to_string(),
        description: Some("Echo a message back to the caller".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "minLength": 1, "description": "Text to echo" }
            },
            "required": ["message"]
        }),
        output_schema: Some(json!({
            "type": "object",
            "properties": {
                "echoed": { "type": "string" }
            },
            "required": ["echoed"]
        })),
        executor: std::sync::Arc::new(EchoExecutor),
    }
}

struct EchoExecutor;

#[async_trait]
impl JobExecutor for EchoExecutor {
    async fn run(
        &self,
        arguments: Value,
        progress: ProgressReporter,
        _cancel: CancellationToken,
    ) -> anyhow::Result<Value> {
        let params: EchoParams = serde_json::from_value(arguments)?;
        progress.report(100);
        Ok(json!({ "echoed": params.message }))
    }
}
