//! Error types and wire error codes for the gateway protocol.

use agentic_gateway::JobError;
use serde_json::{json, Value};

/// Standard JSON-RPC 2.0 error codes, kept for legacy-client compatibility.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Gateway-specific error codes.
pub mod gateway_error_codes {
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const VERSION_INCOMPATIBLE: i32 = -32850;
    pub const SCHEMA_VALIDATION_FAILED: i32 = -32851;
    pub const JOB_NOT_FOUND: i32 = -32852;
    pub const JOB_CAPACITY_EXCEEDED: i32 = -32853;
}

/// All errors the protocol layer can hand back to a client.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Schema validation failed for {stage}: {}", .errors.join("; "))]
    SchemaValidationFailed {
        stage: &'static str,
        errors: Vec<String>,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job capacity exceeded: {active} active jobs (limit {limit})")]
    JobCapacityExceeded { active: usize, limit: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use gateway_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::SchemaValidationFailed { .. } => SCHEMA_VALIDATION_FAILED,
            McpError::JobNotFound(_) => JOB_NOT_FOUND,
            McpError::JobCapacityExceeded { .. } => JOB_CAPACITY_EXCEEDED,
            McpError::Transport(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Extra payload attached to the wire error, when the variant carries
    /// structured detail.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::SchemaValidationFailed { errors, .. } => Some(json!(errors)),
            _ => None,
        }
    }

    /// Shape this error as a wire response echoing the request id.
    pub fn to_response(&self, request_id: Option<&str>) -> Value {
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(data) = self.data() {
            error["data"] = data;
        }
        json!({
            "request_id": request_id,
            "error": error,
        })
    }
}

impl From<JobError> for McpError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(id) => McpError::JobNotFound(id),
            JobError::CapacityExceeded { active, limit } => {
                McpError::JobCapacityExceeded { active, limit }
            }
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
