//! Message framing for newline-delimited JSON.

use serde_json::Value;

use crate::types::{McpError, McpResult};

/// Parse a single line of text as a raw JSON message. Shape normalization
/// (modern vs. legacy) happens later, in the dispatcher.
pub fn parse_line(line: &str) -> McpResult<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_malformed_lines() {
        assert!(parse_line("").is_err());
        assert!(parse_line("   ").is_err());
        assert!(parse_line(r#"{"broken":"#).is_err());

        let err = parse_line(r#"{"broken":"#).unwrap_err();
        assert_eq!(err.code(), -32700);
    }

    #[test]
    fn frames_with_trailing_newline() {
        let framed = frame_message(&serde_json::json!({ "ok": true })).unwrap();
        assert!(framed.ends_with('\n'));
        assert_eq!(framed.trim(), r#"{"ok":true}"#);
    }
}
