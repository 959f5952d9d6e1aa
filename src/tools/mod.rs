//! Tool system for the agents.
//!
//! Each tool declares a name, a description and a JSON schema for its
//! arguments. The registry dispatches model-requested calls by name.

mod calculator;
mod factor;

pub use calculator::{evaluate, CalcError, Calculator};
pub use factor::{find_factors, FactorError, Factorization, FindFactors};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Outcome reported by a tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// A block of tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolContent {
    pub text: String,
}

/// Structured tool result. Input problems are reported here as data,
/// not as `Err`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: ToolStatus,
    pub content: Vec<ToolContent>,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            content: vec![ToolContent { text: text.into() }],
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            content: vec![ToolContent { text: text.into() }],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// All content blocks joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool description.
    fn description(&self) -> &str;

    /// Get the JSON schema for tool parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> anyhow::Result<ToolOutput>;
}

/// Registry of available tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// List all available tools in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Get OpenAI-style function schemas for all tools.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters_schema(),
                    }
                })
            })
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tool.execute(args).await
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.order.iter().filter_map(move |name| self.tools.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(FindFactors))
            .with(Arc::new(Calculator))
    }

    #[test]
    fn lists_tools_in_registration_order() {
        let names: Vec<String> = registry().list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["find_factors", "calculator"]);
    }

    #[test]
    fn duplicate_registration_replaces() {
        let mut reg = registry();
        reg.register(Arc::new(FindFactors));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.list_tools().len(), 2);
    }

    #[test]
    fn schemas_use_function_format() {
        let schemas = registry().get_tool_schemas();
        assert_eq!(schemas[0]["type"], "function");
        assert_eq!(schemas[0]["function"]["name"], "find_factors");
        assert_eq!(
            schemas[0]["function"]["parameters"]["required"],
            json!(["input_text"])
        );
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let out = registry()
            .execute("find_factors", json!({"input_text": "6"}))
            .await
            .unwrap();
        assert!(out.is_success());
        assert_eq!(out.text(), "The factors of 6 are: 1, 2, 3, 6");
    }

    #[tokio::test]
    async fn unknown_tool_is_err() {
        let err = registry().execute("rm_rf", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }

    #[test]
    fn output_serializes_like_tool_payload() {
        let value = serde_json::to_value(ToolOutput::error("nope")).unwrap();
        assert_eq!(value, json!({"status": "error", "content": [{"text": "nope"}]}));
    }
}
