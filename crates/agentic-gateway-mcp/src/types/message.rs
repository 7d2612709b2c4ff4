//! Wire message shapes, modern and legacy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::handshake::ClientHandshake;
use super::request::{JobControlRequest, ToolCallRequest};

/// A pre-2025 request: a top-level protocol-version marker wrapping a
/// `method` + `params` envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyRequest {
    /// The legacy protocol marker. Any of the historical spellings is
    /// accepted.
    #[serde(
        default,
        alias = "protocolVersion",
        alias = "protocol_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: LegacyParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// Parameters nested inside a legacy request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

/// Union of every message shape a session may receive.
///
/// Variant order is the parse order: modern shapes are attempted first, the
/// legacy shape last, so normalization stays centralized here instead of
/// being scattered across key-presence checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    Handshake(ClientHandshake),
    JobControl(JobControlRequest),
    ToolCall(ToolCallRequest),
    Legacy(LegacyRequest),
}
