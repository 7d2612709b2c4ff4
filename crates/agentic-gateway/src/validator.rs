//! Schema validation engine for tool inputs and outputs.
//!
//! Supports the subset of JSON Schema the gateway's tool contracts use:
//! `type`, `properties` (recursive), `required`, `enum`, `minimum`/`maximum`,
//! `minLength`/`maxLength`, `pattern`, and `format` (`email`). Compiled
//! validators are cached keyed by a content hash of the schema, so repeated
//! calls against the same logical schema reuse the compiled matcher even when
//! the schema value was reconstructed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::SchemaValidationResult;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Occupancy of the compiled-validator cache.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
}

/// One compiled schema node. Nested object properties compile recursively.
struct CompiledNode {
    expected_type: Option<String>,
    required: Vec<String>,
    properties: HashMap<String, CompiledNode>,
    enum_values: Option<Vec<Value>>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    /// Compiled matcher for `format: "email"`.
    format_email: Option<Regex>,
}

impl CompiledNode {
    fn compile(schema: &Value) -> Self {
        let obj = schema.as_object();
        let get = |key: &str| obj.and_then(|o| o.get(key));

        let properties = get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, sub)| (name.clone(), CompiledNode::compile(sub)))
                    .collect()
            })
            .unwrap_or_default();

        let pattern = get("pattern").and_then(Value::as_str).and_then(|p| {
            Regex::new(p)
                .inspect_err(|e| tracing::warn!("ignoring unparseable schema pattern '{p}': {e}"))
                .ok()
        });

        Self {
            expected_type: get("type").and_then(Value::as_str).map(str::to_string),
            required: get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            properties,
            enum_values: get("enum").and_then(Value::as_array).cloned(),
            minimum: get("minimum").and_then(Value::as_f64),
            maximum: get("maximum").and_then(Value::as_f64),
            min_length: get("minLength").and_then(Value::as_u64).map(|n| n as usize),
            max_length: get("maxLength").and_then(Value::as_u64).map(|n| n as usize),
            pattern,
            format_email: match get("format").and_then(Value::as_str) {
                Some("email") => Regex::new(EMAIL_PATTERN).ok(),
                _ => None,
            },
        }
    }

    fn check(&self, value: &Value, path: &str, errors: &mut Vec<String>) {
        let label = if path.is_empty() { "value" } else { path };

        if let Some(expected) = &self.expected_type {
            let matches = match expected.as_str() {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                "null" => value.is_null(),
                _ => true,
            };
            if !matches {
                errors.push(format!("'{label}' must be of type '{expected}'"));
                return;
            }
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                errors.push(format!("'{label}' must be one of the allowed values"));
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum {
                if n < min {
                    errors.push(format!("'{label}' must be at least {min}"));
                }
            }
            if let Some(max) = self.maximum {
                if n > max {
                    errors.push(format!("'{label}' must be at most {max}"));
                }
            }
        }

        if let Some(s) = value.as_str() {
            if let Some(min) = self.min_length {
                if s.chars().count() < min {
                    errors.push(format!("'{label}' must be at least {min} characters"));
                }
            }
            if let Some(max) = self.max_length {
                if s.chars().count() > max {
                    errors.push(format!("'{label}' must be at most {max} characters"));
                }
            }
            if let Some(pattern) = &self.pattern {
                if !pattern.is_match(s) {
                    errors.push(format!("'{label}' does not match the required pattern"));
                }
            }
            if let Some(email) = &self.format_email {
                if !email.is_match(s) {
                    errors.push(format!("'{label}' must be a valid email address"));
                }
            }
        }

        if let Some(obj) = value.as_object() {
            for name in &self.required {
                if !obj.contains_key(name) {
                    let field = join_path(path, name);
                    errors.push(format!("'{field}' is required"));
                }
            }
            for (name, sub) in &self.properties {
                if let Some(field_value) = obj.get(name) {
                    sub.check(field_value, &join_path(path, name), errors);
                }
            }
        }
    }
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Validates JSON payloads against tool schemas, caching compiled matchers.
pub struct SchemaValidator {
    cache: RwLock<HashMap<String, Arc<CompiledNode>>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Validate a tool-call input payload.
    pub fn validate_input(&self, schema: &Value, value: &Value) -> SchemaValidationResult {
        self.validate(schema, value)
    }

    /// Validate a tool result payload. Same engine as input validation.
    pub fn validate_output(&self, schema: &Value, value: &Value) -> SchemaValidationResult {
        self.validate(schema, value)
    }

    fn validate(&self, schema: &Value, value: &Value) -> SchemaValidationResult {
        let compiled = self.compiled(schema);
        let mut errors = Vec::new();
        compiled.check(value, "", &mut errors);
        if errors.is_empty() {
            SchemaValidationResult::ok()
        } else {
            SchemaValidationResult::failed(errors)
        }
    }

    /// Current cache occupancy.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self
                .cache
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .len(),
        }
    }

    fn compiled(&self, schema: &Value) -> Arc<CompiledNode> {
        let key = schema_hash(schema);
        {
            let cache = self
                .cache
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(node) = cache.get(&key) {
                return node.clone();
            }
        }
        let node = Arc::new(CompiledNode::compile(schema));
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, node.clone());
        node
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable content hash of a schema.
///
/// serde_json renders object keys in sorted order, so two schemas with the
/// same logical content hash identically regardless of how they were built.
fn schema_hash(schema: &Value) -> String {
    let canonical = serde_json::to_string(schema).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

/// Normalize an older, looser tool schema into the object-envelope form.
///
/// Guarantees a `properties` key, wraps bare property maps under
/// `type: "object"`, and preserves fields it does not recognize.
pub fn upgrade_tool_schema(legacy: &Value) -> Value {
    let Some(obj) = legacy.as_object() else {
        return serde_json::json!({ "type": "object", "properties": {} });
    };

    // A bare property map: no envelope keys at all, every value is itself a
    // schema-shaped object.
    let is_bare_map = !obj.is_empty()
        && !obj.contains_key("type")
        && !obj.contains_key("properties")
        && obj.values().all(Value::is_object);
    if is_bare_map {
        return serde_json::json!({ "type": "object", "properties": obj.clone() });
    }

    let mut upgraded: Map<String, Value> = obj.clone();
    upgraded
        .entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    upgraded
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    Value::Object(upgraded)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn validator() -> SchemaValidator {
        SchemaValidator::new()
    }

    #[test]
    fn accepts_conforming_payload() {
        let schema = json!({
            "type": "object",
            "properties": {
                "email": { "type": "string", "format": "email" },
                "age": { "type": "integer", "minimum": 0, "maximum": 150 }
            },
            "required": ["email"]
        });
        let result = validator().validate_input(&schema, &json!({ "email": "a@b.dev", "age": 44 }));
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn rejects_invalid_email() {
        let schema = json!({
            "type": "object",
            "properties": { "email": { "type": "string", "format": "email" } },
            "required": ["email"]
        });
        let result = validator().validate_input(&schema, &json!({ "email": "not-an-email" }));
        assert!(!result.valid);
        assert!(!result.errors.is_empty());
        assert!(result.errors[0].contains("email"));
    }

    #[test]
    fn reports_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let result = validator().validate_input(&schema, &json!({}));
        assert!(!result.valid);
        assert!(result.errors[0].contains("required"));
    }

    #[test]
    fn checks_type_enum_and_bounds() {
        let v = validator();
        let schema = json!({
            "type": "object",
            "properties": {
                "mode": { "type": "string", "enum": ["fast", "slow"] },
                "level": { "type": "number", "minimum": 1, "maximum": 5 },
                "tag": { "type": "string", "minLength": 2, "maxLength": 4 }
            }
        });

        assert!(v.validate_input(&schema, &json!({ "mode": "fast", "level": 3, "tag": "ab" })).valid);
        assert!(!v.validate_input(&schema, &json!({ "mode": "warp" })).valid);
        assert!(!v.validate_input(&schema, &json!({ "level": 9 })).valid);
        assert!(!v.validate_input(&schema, &json!({ "tag": "toolong" })).valid);
        assert!(!v.validate_input(&schema, &json!({ "level": "three" })).valid);
    }

    #[test]
    fn pattern_is_enforced() {
        let schema = json!({
            "type": "object",
            "properties": { "id": { "type": "string", "pattern": "^[a-z]{3}-[0-9]+$" } }
        });
        let v = validator();
        assert!(v.validate_input(&schema, &json!({ "id": "abc-42" })).valid);
        assert!(!v.validate_input(&schema, &json!({ "id": "ABC-42" })).valid);
    }

    #[test]
    fn nested_properties_are_walked() {
        let schema = json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": { "name": { "type": "string", "minLength": 1 } },
                    "required": ["name"]
                }
            },
            "required": ["user"]
        });
        let v = validator();
        assert!(v.validate_input(&schema, &json!({ "user": { "name": "kim" } })).valid);

        let result = v.validate_input(&schema, &json!({ "user": {} }));
        assert!(!result.valid);
        assert!(result.errors[0].contains("user.name"));
    }

    #[test]
    fn cache_grows_once_per_distinct_schema() {
        let v = validator();
        let schema_a = json!({ "type": "object", "properties": { "a": { "type": "string" } } });
        // Same logical schema, different key insertion order.
        let schema_a2 = json!({ "properties": { "a": { "type": "string" } }, "type": "object" });
        let schema_b = json!({ "type": "object", "properties": { "b": { "type": "string" } } });

        v.validate_input(&schema_a, &json!({}));
        v.validate_input(&schema_a, &json!({}));
        v.validate_input(&schema_a2, &json!({}));
        assert_eq!(v.cache_stats().size, 1);

        v.validate_output(&schema_b, &json!({}));
        assert_eq!(v.cache_stats().size, 2);
    }

    #[test]
    fn upgrade_always_yields_properties_key() {
        let upgraded = upgrade_tool_schema(&json!({}));
        assert!(upgraded.get("properties").is_some());
        assert_eq!(upgraded["type"], "object");

        let upgraded = upgrade_tool_schema(&json!(null));
        assert!(upgraded.get("properties").is_some());
    }

    #[test]
    fn upgrade_wraps_bare_property_maps() {
        let legacy = json!({
            "name": { "type": "string" },
            "count": { "type": "integer" }
        });
        let upgraded = upgrade_tool_schema(&legacy);
        assert_eq!(upgraded["type"], "object");
        assert_eq!(upgraded["properties"]["name"]["type"], "string");
        assert_eq!(upgraded["properties"]["count"]["type"], "integer");
    }

    #[test]
    fn upgrade_preserves_unrecognized_fields() {
        let legacy = json!({
            "type": "object",
            "properties": { "x": { "type": "string" } },
            "x-vendor-extension": true
        });
        let upgraded = upgrade_tool_schema(&legacy);
        assert_eq!(upgraded["x-vendor-extension"], true);
        assert_eq!(upgraded["properties"]["x"]["type"], "string");
    }
}
