//! Tool registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use agentic_gateway::JobExecutor;

use crate::types::ToolDefinition;

use super::{echo, sleep};

/// A registered tool: its declared schemas plus the executor that does the
/// actual work. The gateway never inspects what the executor computes — it
/// only manages the protocol envelope around it.
pub struct ToolSpec {
    pub tool_id: String,
    pub description: Option<String>,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub executor: Arc<dyn JobExecutor>,
}

impl ToolSpec {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_id: self.tool_id.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
        }
    }
}

/// Holds every tool the server advertises. Built before the server starts
/// and immutable afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolSpec>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(echo::spec());
        registry.register(sleep::spec());
        registry
    }

    /// Register a tool, replacing any previous spec under the same id.
    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.tool_id.clone(), Arc::new(spec));
    }

    pub fn get(&self, tool_id: &str) -> Option<Arc<ToolSpec>> {
        self.tools.get(tool_id).cloned()
    }

    /// Definitions of every registered tool, sorted by id.
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|spec| spec.definition()).collect();
        definitions.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
