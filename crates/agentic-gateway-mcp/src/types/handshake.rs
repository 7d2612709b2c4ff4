//! Handshake and negotiation types.

use serde::{Deserialize, Serialize};

/// Protocol version advertised by this server, as a `YYYY-MM` cycle.
pub const PROTOCOL_VERSION: &str = "2025-11";
pub const SERVER_ID: &str = "agentic-gateway";
pub const SERVER_NAME: &str = "agentic-gateway-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capabilities this server supports.
pub const SERVER_CAPABILITIES: &[&str] = &["tools", "async", "progress", "cancellation"];

/// First message a client sends on a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientHandshake {
    pub client_id: String,
    /// `YYYY-MM` protocol cycle the client speaks.
    pub mcp_version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Transport the server answers over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn default_info() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }
}

/// The server's half of the handshake, advertising its fixed version and
/// capability list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHandshake {
    pub server_id: String,
    pub mcp_version: String,
    pub transport: Transport,
    pub capabilities: Vec<String>,
    pub server_info: ServerInfo,
}

/// Immutable outcome of a handshake, produced once per negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreed_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreed_capabilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NegotiationResult {
    pub fn rejected(error: String) -> Self {
        Self {
            success: false,
            agreed_version: None,
            agreed_capabilities: None,
            error: Some(error),
        }
    }
}

/// Wire reply to a handshake: the server handshake plus the negotiation
/// outcome for this session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    #[serde(flatten)]
    pub server: ServerHandshake,
    pub negotiation: NegotiationResult,
}
