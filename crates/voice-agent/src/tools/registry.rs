use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AgentError;
use crate::models::tool::{Tool, ToolOutcome};

/// A capability that can be invoked by the model through a tool call
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The descriptor exposed to the model
    fn spec(&self) -> Tool;

    /// Run the tool with the arguments the model supplied.
    ///
    /// Argument validation happens here, against the tool's own parameter contract. Every
    /// failure is returned as an `Err` outcome so the model can see it and recover.
    async fn call(&self, arguments: Value) -> ToolOutcome;
}

/// Wraps a plain function as a tool handler
pub struct FnTool<F> {
    spec: Tool,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(Value) -> ToolOutcome + Send + Sync,
{
    pub fn new(spec: Tool, func: F) -> Self {
        Self { spec, func }
    }
}

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(Value) -> ToolOutcome + Send + Sync,
{
    fn spec(&self) -> Tool {
        self.spec.clone()
    }

    async fn call(&self, arguments: Value) -> ToolOutcome {
        (self.func)(arguments)
    }
}

struct RegisteredTool {
    spec: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Maps tool names to handlers. Built once, then shared read-only between runs.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the name from its own spec
    pub fn register<H: ToolHandler + 'static>(&mut self, handler: H) {
        let spec = handler.spec();
        self.register_with_spec(spec, Arc::new(handler));
    }

    /// Register a handler under an explicit spec. Re-registering a name replaces the
    /// previous binding in place.
    pub fn register_with_spec(&mut self, spec: Tool, handler: Arc<dyn ToolHandler>) {
        let entry = RegisteredTool { spec, handler };
        match self.index.get(&entry.spec.name) {
            Some(&position) => {
                tracing::debug!(tool = %entry.spec.name, "replacing registered tool");
                self.entries[position] = entry;
            }
            None => {
                self.index
                    .insert(entry.spec.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Specs of every registered tool, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|entry| entry.spec.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&position| &self.entries[position].spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatch a call by name. Unknown names come back as `ToolNotFound`.
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolOutcome {
        let position = self
            .index
            .get(name)
            .copied()
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        self.entries[position].handler.call(arguments).await
    }
}
