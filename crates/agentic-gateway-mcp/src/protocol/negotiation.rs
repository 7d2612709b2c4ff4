//! Protocol version and capability negotiation.

use std::collections::HashSet;

use crate::types::{
    ClientHandshake, NegotiationResult, ServerHandshake, ServerInfo, Transport,
    PROTOCOL_VERSION, SERVER_CAPABILITIES,
};

/// Decides version compatibility and capability intersection for a handshake.
///
/// Versions are `YYYY-MM` cycle identifiers; a client is compatible when its
/// cycle is within one of the server's.
#[derive(Debug, Clone)]
pub struct VersionNegotiator {
    version: String,
    capabilities: Vec<String>,
}

impl VersionNegotiator {
    pub fn new(version: impl Into<String>, capabilities: Vec<String>) -> Self {
        Self {
            version: version.into(),
            capabilities,
        }
    }

    /// The server's fixed advertised version and capability set.
    pub fn with_defaults() -> Self {
        Self::new(
            PROTOCOL_VERSION,
            SERVER_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
        )
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Negotiate against a client handshake. Failures are returned as data,
    /// never as an error.
    pub fn negotiate(&self, handshake: &ClientHandshake) -> NegotiationResult {
        let Some(server_cycle) = parse_cycle(&self.version) else {
            return NegotiationResult::rejected(format!(
                "server version '{}' is not a valid YYYY-MM cycle",
                self.version
            ));
        };
        let Some(client_cycle) = parse_cycle(&handshake.mcp_version) else {
            return NegotiationResult::rejected(format!(
                "unrecognized version '{}': expected YYYY-MM",
                handshake.mcp_version
            ));
        };

        if (server_cycle - client_cycle).abs() > 1 {
            return NegotiationResult::rejected(format!(
                "client version {} is incompatible with server version {}",
                handshake.mcp_version, self.version
            ));
        }

        // Cycles match or differ by one; either way the session speaks the
        // server's own version.
        let client_caps: HashSet<&str> =
            handshake.capabilities.iter().map(String::as_str).collect();
        let agreed: Vec<String> = self
            .capabilities
            .iter()
            .filter(|cap| client_caps.contains(cap.as_str()))
            .cloned()
            .collect();

        NegotiationResult {
            success: true,
            agreed_version: Some(self.version.clone()),
            agreed_capabilities: Some(agreed),
            error: None,
        }
    }

    /// Pure constructor for the server's half of the handshake. Deterministic
    /// for the same inputs, no side effects.
    pub fn create_server_handshake(
        &self,
        server_id: &str,
        transport: Transport,
        server_info: ServerInfo,
    ) -> ServerHandshake {
        ServerHandshake {
            server_id: server_id.to_string(),
            mcp_version: self.version.clone(),
            transport,
            capabilities: self.capabilities.clone(),
            server_info,
        }
    }
}

impl Default for VersionNegotiator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// `"YYYY-MM"` to a monotone cycle count (`year * 12 + month`).
fn parse_cycle(version: &str) -> Option<i32> {
    let (year, month) = version.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: i32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(year * 12 + month)
}
