//! Optional registry publication of server metadata.
//!
//! Invoked once at startup when capability advertisement is enabled. The
//! transport and payload schema of a real registry are external concerns;
//! the default publisher just logs the metadata.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolHandler;
use crate::types::{Transport, SERVER_ID, SERVER_VERSION};

/// Metadata advertised to a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMetadata {
    pub server_id: String,
    pub version: String,
    pub mcp_version: String,
    pub transport: Transport,
    pub capabilities: Vec<String>,
    pub tools: Vec<String>,
}

/// Destination for a single startup `publish` call.
#[async_trait]
pub trait RegistryPublisher: Send + Sync {
    async fn publish(&self, metadata: &ServerMetadata);
}

/// Default publisher: logs the metadata instead of calling out.
#[derive(Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl RegistryPublisher for LogPublisher {
    async fn publish(&self, metadata: &ServerMetadata) {
        tracing::info!(
            server_id = %metadata.server_id,
            mcp_version = %metadata.mcp_version,
            tools = metadata.tools.len(),
            "advertising server metadata"
        );
    }
}

/// Build the metadata for this handler and publish it.
pub async fn advertise(
    handler: &ProtocolHandler,
    transport: Transport,
    publisher: &dyn RegistryPublisher,
) {
    let metadata = ServerMetadata {
        server_id: SERVER_ID.to_string(),
        version: SERVER_VERSION.to_string(),
        mcp_version: handler.negotiator().version().to_string(),
        transport,
        capabilities: crate::types::SERVER_CAPABILITIES
            .iter()
            .map(|c| c.to_string())
            .collect(),
        tools: handler
            .tools()
            .list()
            .into_iter()
            .map(|t| t.tool_id)
            .collect(),
    };
    publisher.publish(&metadata).await;
}
