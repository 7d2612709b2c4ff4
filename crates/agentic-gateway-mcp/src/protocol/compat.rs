//! Backward compatibility with the pre-2025 message shape.
//!
//! Conversions here are total: malformed legacy input is adapted best-effort
//! rather than rejected, so the modern pipeline downstream can apply its own
//! validation.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::types::{CallMode, ClientHandshake, LegacyRequest, ToolCallRequest};

/// Client id stamped on requests arriving through the legacy shape.
pub const LEGACY_CLIENT_ID: &str = "legacy-client";
/// Version stamped on legacy requests that carry no usable marker.
pub const LEGACY_PROTOCOL_VERSION: &str = "2025-10";

/// True if the message carries a top-level protocol marker plus a nested
/// `method`/`params` shape, and lacks the modern `request_id`/`tool_id`
/// fields.
pub fn is_legacy_request(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    let has_marker = obj.contains_key("protocol_version")
        || obj.contains_key("protocolVersion")
        || obj.contains_key("version")
        || obj.contains_key("jsonrpc");
    let has_rpc_shape = obj.contains_key("method");
    let has_modern = obj.contains_key("request_id") || obj.contains_key("tool_id");
    has_marker && has_rpc_shape && !has_modern
}

/// Adapt a legacy request into a modern tool call.
///
/// Synthesizes a fresh `request_id`, maps `params.name` to `tool_id` and
/// `params.arguments` to `arguments` (the legacy `method` is informational
/// only), and stamps the default client id and version for downstream
/// bookkeeping.
pub fn convert_to_modern(legacy: &LegacyRequest) -> ToolCallRequest {
    ToolCallRequest {
        request_id: Uuid::new_v4().to_string(),
        tool_id: legacy.params.name.clone().unwrap_or_default(),
        arguments: legacy.params.arguments.clone(),
        mode: CallMode::Sync,
        client_id: Some(LEGACY_CLIENT_ID.to_string()),
        mcp_version: Some(
            legacy
                .version
                .clone()
                .unwrap_or_else(|| LEGACY_PROTOCOL_VERSION.to_string()),
        ),
    }
}

/// Adapt a legacy `initialize` request into a modern client handshake.
pub fn convert_handshake(legacy: &LegacyRequest) -> ClientHandshake {
    ClientHandshake {
        client_id: legacy
            .params
            .client_id
            .clone()
            .unwrap_or_else(|| LEGACY_CLIENT_ID.to_string()),
        mcp_version: legacy
            .version
            .clone()
            .unwrap_or_else(|| LEGACY_PROTOCOL_VERSION.to_string()),
        capabilities: legacy.params.capabilities.clone().unwrap_or_default(),
    }
}

/// Shape a modern response for a legacy caller.
///
/// With `wrap_result`, the whole modern response nests under the legacy
/// `result` key next to the echoed legacy `id`. Without it, fields pass
/// through with legacy names (`request_id` becomes `id`).
pub fn convert_to_legacy(modern: &Value, legacy_id: Option<&Value>, wrap_result: bool) -> Value {
    let id = legacy_id.cloned().unwrap_or(Value::Null);
    if wrap_result {
        return json!({
            "protocol_version": LEGACY_PROTOCOL_VERSION,
            "id": id,
            "result": modern,
        });
    }

    let mut fields: Map<String, Value> = modern.as_object().cloned().unwrap_or_default();
    if let Some(request_id) = fields.remove("request_id") {
        fields.entry("id").or_insert(request_id);
    }
    fields.insert(
        "protocol_version".to_string(),
        Value::String(LEGACY_PROTOCOL_VERSION.to_string()),
    );
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detects_legacy_shape() {
        let legacy = json!({
            "protocol_version": "2025-10",
            "method": "tools/call",
            "params": { "name": "echo", "arguments": { "message": "hi" } }
        });
        assert!(is_legacy_request(&legacy));

        let modern = json!({
            "request_id": "r1",
            "tool_id": "echo",
            "arguments": {},
            "mode": "sync"
        });
        assert!(!is_legacy_request(&modern));

        // A marker alone is not enough.
        assert!(!is_legacy_request(&json!({ "version": "2025-10" })));
        // Modern fields win even when a marker is present.
        assert!(!is_legacy_request(&json!({
            "version": "2025-10", "method": "x", "tool_id": "echo"
        })));
    }

    #[test]
    fn converts_legacy_call_to_modern() {
        let legacy: LegacyRequest = serde_json::from_value(json!({
            "protocolVersion": "2025-10",
            "method": "tools/call",
            "params": { "name": "echo", "arguments": { "message": "hi" } },
            "id": 7
        }))
        .unwrap();

        let modern = convert_to_modern(&legacy);
        assert!(!modern.request_id.is_empty());
        assert_eq!(modern.tool_id, "echo");
        assert_eq!(modern.arguments, Some(json!({ "message": "hi" })));
        assert_eq!(modern.mode, CallMode::Sync);
        assert_eq!(modern.client_id.as_deref(), Some(LEGACY_CLIENT_ID));
        assert_eq!(modern.mcp_version.as_deref(), Some("2025-10"));
    }

    #[test]
    fn conversion_is_total_on_malformed_input() {
        let empty = LegacyRequest::default();
        let modern = convert_to_modern(&empty);
        assert!(!modern.request_id.is_empty());
        assert_eq!(modern.tool_id, "");
        assert_eq!(modern.mcp_version.as_deref(), Some(LEGACY_PROTOCOL_VERSION));
    }

    #[test]
    fn legacy_handshake_gets_defaults() {
        let legacy: LegacyRequest = serde_json::from_value(json!({
            "version": "2025-10",
            "method": "initialize",
            "params": {}
        }))
        .unwrap();
        let handshake = convert_handshake(&legacy);
        assert_eq!(handshake.client_id, LEGACY_CLIENT_ID);
        assert_eq!(handshake.mcp_version, "2025-10");
        assert!(handshake.capabilities.is_empty());
    }

    #[test]
    fn wraps_modern_response_under_legacy_result() {
        let modern = json!({ "request_id": "r1", "status": "success", "result": { "ok": true } });
        let wrapped = convert_to_legacy(&modern, Some(&json!(3)), true);
        assert_eq!(wrapped["id"], 3);
        assert_eq!(wrapped["result"]["status"], "success");
        assert_eq!(wrapped["result"]["result"]["ok"], true);
    }

    #[test]
    fn passthrough_renames_request_id() {
        let modern = json!({ "request_id": "r1", "status": "success" });
        let converted = convert_to_legacy(&modern, None, false);
        assert_eq!(converted["id"], "r1");
        assert!(converted.get("request_id").is_none());
        assert_eq!(converted["status"], "success");
    }
}
