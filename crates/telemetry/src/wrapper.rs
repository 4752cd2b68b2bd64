//! Tool execution wrapper: decorates a tool with lifecycle telemetry.
//!
//! The wrapped tool has the same name, schema and call signature as the
//! inner tool. Telemetry is a side channel: the caller receives exactly the
//! inner tool's output or error. A panicking tool still gets its `FAILED`
//! record before the panic resumes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chainclaw_core::{
    ExecutionRecord, ExecutionState, ProgressSink, ProgressUpdate, Tool, ToolError,
};
use futures::FutureExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::callback::{CallbackManager, panic_message};

/// A tool whose invocations are reported to a [`CallbackManager`].
pub struct WrappedTool {
    inner: Arc<dyn Tool>,
    callbacks: Arc<CallbackManager>,
}

impl WrappedTool {
    pub fn new(inner: Arc<dyn Tool>, callbacks: Arc<CallbackManager>) -> Self {
        Self { inner, callbacks }
    }

    /// The undecorated tool.
    pub fn inner(&self) -> &Arc<dyn Tool> {
        &self.inner
    }
}

/// Wrap `tool` so its invocations are reported to `callbacks`.
pub fn wrap_tool(tool: Arc<dyn Tool>, callbacks: Arc<CallbackManager>) -> Arc<dyn Tool> {
    Arc::new(WrappedTool::new(tool, callbacks))
}

/// Progress sink handed to the inner tool: turns every update into an
/// `IN_PROCESS` event, then forwards it to the caller's own sink.
struct TelemetrySink<'a> {
    started: &'a ExecutionRecord,
    callbacks: &'a CallbackManager,
    downstream: &'a dyn ProgressSink,
}

#[async_trait]
impl<'a> ProgressSink for TelemetrySink<'a> {
    async fn emit(&self, update: ProgressUpdate) {
        let mut record = self
            .started
            .transition(ExecutionState::InProcess, update.display_message());
        record.data = serde_json::to_value(&update).ok();
        self.callbacks.notify_all(&record).await;
        self.downstream.emit(update).await;
    }
}

/// Parse tool output as JSON for the event payload only. Output that is not
/// JSON is carried as a plain string.
fn output_payload(output: &str) -> serde_json::Value {
    match serde_json::from_str(output) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Tool output is not JSON, reporting raw text");
            serde_json::Value::String(output.to_string())
        }
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl Tool for WrappedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> serde_json::Value {
        self.inner.input_schema()
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<(), ToolError> {
        self.inner.validate_input(input)
    }

    async fn invoke(
        &self,
        input: serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<String, ToolError> {
        let clock = Instant::now();
        let started = ExecutionRecord::started(
            Uuid::new_v4().to_string(),
            self.inner.name(),
            input.clone(),
        );
        self.callbacks.notify_all(&started).await;

        let sink = TelemetrySink {
            started: &started,
            callbacks: &self.callbacks,
            downstream: progress,
        };
        let outcome = AssertUnwindSafe(self.inner.invoke(input, &sink))
            .catch_unwind()
            .await;
        let elapsed = elapsed_ms(clock);

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(tool = %started.tool_name, panic = %message, "Tool panicked");
                let failed = started
                    .transition(
                        ExecutionState::Failed,
                        format!("Failed {}: panicked", started.tool_name),
                    )
                    .with_error("panicked", message)
                    .with_execution_time(elapsed);
                self.callbacks.notify_all(&failed).await;
                std::panic::resume_unwind(payload);
            }
        };

        let terminal = match &result {
            Ok(output) => started
                .transition(
                    ExecutionState::Completed,
                    format!("Completed {} in {elapsed}ms", started.tool_name),
                )
                .with_data(output_payload(output))
                .with_execution_time(elapsed),
            Err(err) => started
                .transition(
                    ExecutionState::Failed,
                    format!("Failed {}: {err}", started.tool_name),
                )
                .with_error(err.kind(), err.to_string())
                .with_execution_time(elapsed),
        };
        self.callbacks.notify_all(&terminal).await;

        result
    }
}
