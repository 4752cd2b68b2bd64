//! Execution records: the lifecycle events of a single tool invocation.
//!
//! A record is created when an invocation starts, re-emitted on every state
//! transition, and dropped once the terminal state has been delivered.
//! Nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an invocation.
///
/// `Started → (InProcess)* → (Completed | Failed)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Started,
    InProcess,
    Completed,
    Failed,
}

impl ExecutionState {
    /// Whether no further events follow this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionState::Started => "STARTED",
            ExecutionState::InProcess => "IN_PROCESS",
            ExecutionState::Completed => "COMPLETED",
            ExecutionState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One lifecycle event for one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique per invocation; correlates events across concurrent calls.
    pub id: String,

    pub tool_name: String,

    /// The input the tool was invoked with.
    pub input: serde_json::Value,

    pub state: ExecutionState,

    pub timestamp: DateTime<Utc>,

    /// Progress payload (`InProcess`) or parsed output (`Completed`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Short error kind, e.g. `no_provider_available`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Wall-clock time since `Started`, set on terminal events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl ExecutionRecord {
    /// The `Started` record for a new invocation.
    pub fn started(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        let tool_name = tool_name.into();
        Self {
            id: id.into(),
            message: format!("Started {tool_name}"),
            tool_name,
            input,
            state: ExecutionState::Started,
            timestamp: Utc::now(),
            data: None,
            error: None,
            error_kind: None,
            execution_time_ms: None,
        }
    }

    /// Derive the next record of the same invocation.
    pub fn transition(&self, state: ExecutionState, message: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            tool_name: self.tool_name.clone(),
            input: self.input.clone(),
            state,
            timestamp: Utc::now(),
            data: None,
            message: message.into(),
            error: None,
            error_kind: None,
            execution_time_ms: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, kind: impl Into<String>, error: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self.error = Some(error.into());
        self
    }

    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }
}
