//! The ChainClaw agent.
//!
//! The agent holds the registered plugins and exposes their tools:
//!
//! 1. **Register** plugins; every tool is wrapped for lifecycle telemetry
//! 2. **Resolve** free text to a tool call through an [`IntentResolver`]
//! 3. **Validate** the call's input against the tool's JSON Schema
//! 4. **Invoke** the wrapped tool; observers see `STARTED` → `IN_PROCESS`* →
//!    `COMPLETED` | `FAILED`

pub mod error;
pub mod intent;
pub mod runner;

pub use error::AgentError;
pub use intent::{IntentResolver, KeywordResolver};
pub use runner::Agent;
