//! Wire response shapes for tool listing and job control.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub tool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    pub tools: Vec<ToolDefinition>,
}

/// Acknowledgement of a cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub request_id: String,
    pub job_id: String,
    pub cancelled: bool,
}
