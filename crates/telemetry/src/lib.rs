//! Tool execution telemetry for ChainClaw.
//!
//! Wraps any [`Tool`](chainclaw_core::Tool) so every invocation emits a
//! lifecycle (`STARTED → IN_PROCESS* → COMPLETED | FAILED`) to the observers
//! registered on a [`CallbackManager`]. Observers are isolated from each other
//! and from the tool: a failing observer is logged and skipped, and the tool's
//! own result or error reaches the caller unchanged.

pub mod callback;
pub mod observers;
pub mod wrapper;

pub use callback::{CallbackManager, ExecutionObserver, FnObserver, ObserverId};
pub use observers::{BroadcastObserver, LoggingObserver, StatsObserver, StatsSummary, ToolStats};
pub use wrapper::{WrappedTool, wrap_tool};

/// Errors raised by observers. Never propagated past the callback manager.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("observer failed: {0}")]
    Failed(String),

    #[error("observer '{observer}' panicked: {message}")]
    Panicked { observer: String, message: String },
}

impl ObserverError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ObserverError::Failed(reason.into())
    }
}
