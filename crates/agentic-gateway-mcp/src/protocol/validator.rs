//! Well-formedness checks on incoming protocol messages.

use crate::types::{ClientHandshake, McpError, McpResult, ToolCallRequest};

/// Validate that a client handshake is well-formed.
pub fn validate_handshake(handshake: &ClientHandshake) -> McpResult<()> {
    if handshake.client_id.is_empty() {
        return Err(McpError::InvalidRequest(
            "client_id must not be empty".to_string(),
        ));
    }
    if handshake.mcp_version.is_empty() {
        return Err(McpError::InvalidRequest(
            "mcp_version must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a tool call is well-formed. Schema validation of the
/// arguments happens separately, against the tool's declared contract.
pub fn validate_tool_call(request: &ToolCallRequest) -> McpResult<()> {
    if request.request_id.is_empty() {
        return Err(McpError::InvalidRequest(
            "request_id must not be empty".to_string(),
        ));
    }
    if request.tool_id.is_empty() {
        return Err(McpError::InvalidRequest(
            "tool_id must not be empty".to_string(),
        ));
    }
    Ok(())
}
