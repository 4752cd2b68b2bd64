//! Agent orchestration errors.

use chainclaw_core::ToolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Could not resolve a tool for: {0}")]
    Unresolved(String),

    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(String),

    #[error("Tool '{tool}' from plugin '{plugin}' is already provided by plugin '{existing}'")]
    ToolConflict {
        tool: String,
        plugin: String,
        existing: String,
    },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl From<AgentError> for chainclaw_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Tool(e) => chainclaw_core::Error::Tool(e),
            AgentError::UnknownTool(name) => ToolError::NotFound(name).into(),
            other => chainclaw_core::Error::Internal(other.to_string()),
        }
    }
}
