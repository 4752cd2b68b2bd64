//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what the agent invokes to act on a network: query a balance,
//! quote a swap, send a transfer. Each tool has a name, a description, a JSON
//! Schema for its input, and an async `invoke` that receives a progress sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::ToolError;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// A tool definition handed to whatever selects tools (an LLM, a resolver).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input
    pub parameters: serde_json::Value,
}

/// A progress report emitted by a running tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion percentage, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,

    /// Human-readable status line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Arbitrary structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProgressUpdate {
    pub fn percent(percent: f64) -> Self {
        Self {
            percent: Some(percent),
            ..Self::default()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The message to show for this update: the explicit message, else
    /// `"N% complete"`, else a generic status. A non-finite percent counts
    /// as absent.
    pub fn display_message(&self) -> String {
        let percent = self.percent.filter(|p| p.is_finite());
        match (&self.message, percent) {
            (Some(message), _) => message.clone(),
            (None, Some(percent)) => format!("{}% complete", percent.clamp(0.0, 100.0).round()),
            (None, None) => "In progress".to_string(),
        }
    }
}

/// Receives progress reports from a running tool.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, update: ProgressUpdate);
}

/// A sink that discards every update. Used when nobody is listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn emit(&self, _update: ProgressUpdate) {}
}

/// The core Tool trait.
///
/// Plugins implement this for each capability they expose. The progress sink
/// is always supplied; tools that have nothing to report simply ignore it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_balance").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool.
    async fn invoke(
        &self,
        input: serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<String, ToolError>;

    /// Check `input` against [`input_schema`](Tool::input_schema).
    fn validate_input(&self, input: &serde_json::Value) -> Result<(), ToolError> {
        validate_against_schema(&self.input_schema(), input)
    }

    /// Convert this tool into a ToolDefinition.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}

/// Validate a JSON instance against a JSON Schema document.
///
/// All violations are collected into one `InvalidArguments` message.
pub fn validate_against_schema(
    schema: &serde_json::Value,
    input: &serde_json::Value,
) -> Result<(), ToolError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ToolError::InvalidArguments(format!("invalid input schema: {e}")))?;

    let errors: Vec<String> = validator.iter_errors(input).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        debug!(errors = ?errors, "Tool input rejected by schema");
        Err(ToolError::InvalidArguments(errors.join("; ")))
    }
}

/// A registry of available tools, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(pos) => self.tools[pos] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// All tools, in registration order.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Get all tool definitions.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Validate and execute a tool call.
    pub async fn execute(
        &self,
        call: &ToolCall,
        progress: &dyn ProgressSink,
    ) -> Result<String, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.validate_input(&call.arguments)?;
        tool.invoke(call.arguments.clone(), progress).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
