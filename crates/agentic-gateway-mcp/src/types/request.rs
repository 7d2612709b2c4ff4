//! Tool-call and job-control request types.

use agentic_gateway::JobStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a tool call should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    #[default]
    Sync,
    Async,
}

/// A modern tool invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub request_id: String,
    pub tool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default)]
    pub mode: CallMode,
    /// Stamped by the compatibility adapter for legacy callers; absent on
    /// native modern requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_version: Option<String>,
}

impl ToolCallRequest {
    /// Arguments with `null`/absent normalized to an empty object.
    pub fn arguments_or_empty(&self) -> Value {
        match &self.arguments {
            Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
            Some(args) => args.clone(),
        }
    }
}

/// Operations on an already-submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOp {
    Poll,
    Resume,
    Cancel,
    List,
}

fn default_list_limit() -> usize {
    50
}

/// A job-control request: poll, resume, cancel, or list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobControlRequest {
    pub request_id: String,
    pub op: JobOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}
