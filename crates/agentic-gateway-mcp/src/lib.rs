//! AgenticGateway MCP Server — version-negotiating protocol compliance layer
//! with trackable asynchronous tool jobs.

pub mod config;
pub mod protocol;
pub mod publish;
pub mod repl;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{resolve_config, GatewayConfig};
pub use protocol::{ProtocolHandler, VersionNegotiator};
pub use tools::ToolRegistry;
pub use transport::StdioTransport;
