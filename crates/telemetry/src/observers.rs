//! Built-in observers: structured logging, broadcast streaming, and running
//! per-tool statistics.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chainclaw_core::{ExecutionRecord, ExecutionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ObserverError;
use crate::callback::ExecutionObserver;

// ── Logging ───────────────────────────────────────────────────────────────

/// Writes one `tracing` line per lifecycle event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

#[async_trait]
impl ExecutionObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError> {
        match record.state {
            ExecutionState::Started => info!(
                execution_id = %record.id,
                tool = %record.tool_name,
                "Tool started"
            ),
            ExecutionState::InProcess => debug!(
                execution_id = %record.id,
                tool = %record.tool_name,
                progress = %record.message,
                "Tool progress"
            ),
            ExecutionState::Completed => info!(
                execution_id = %record.id,
                tool = %record.tool_name,
                duration_ms = record.execution_time_ms.unwrap_or(0),
                "Tool completed"
            ),
            ExecutionState::Failed => warn!(
                execution_id = %record.id,
                tool = %record.tool_name,
                duration_ms = record.execution_time_ms.unwrap_or(0),
                error = record.error.as_deref().unwrap_or("unknown"),
                "Tool failed"
            ),
        }
        Ok(())
    }
}

// ── Broadcast ─────────────────────────────────────────────────────────────

/// Forwards every record into a `tokio::sync::broadcast` channel so any
/// number of consumers can stream lifecycle events.
pub struct BroadcastObserver {
    sender: broadcast::Sender<Arc<ExecutionRecord>>,
}

impl BroadcastObserver {
    /// Create a new broadcast observer with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive records.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ExecutionRecord>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ExecutionObserver for BroadcastObserver {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError> {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(record.clone()));
        Ok(())
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────

/// Running counters for one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStats {
    pub invocations: u64,
    pub completed: u64,
    pub failed: u64,
    pub progress_events: u64,
    /// Sum of terminal `execution_time_ms`.
    pub total_ms: u64,
    pub max_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ToolStats {
    /// Invocations that have not reached a terminal state yet.
    pub fn in_flight(&self) -> u64 {
        self.invocations.saturating_sub(self.completed + self.failed)
    }

    /// Mean terminal execution time in milliseconds.
    pub fn average_ms(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.total_ms as f64 / finished as f64
        }
    }
}

/// Point-in-time report from a [`StatsObserver`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    pub tools: BTreeMap<String, ToolStats>,
    pub total_invocations: u64,
    pub total_failures: u64,
}

/// Aggregates running totals per tool. Keeps counters only, never records.
#[derive(Debug, Default)]
pub struct StatsObserver {
    tools: RwLock<BTreeMap<String, ToolStats>>,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for one tool, if it has been seen.
    pub fn tool(&self, name: &str) -> Option<ToolStats> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn summary(&self) -> StatsSummary {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        StatsSummary {
            total_invocations: tools.values().map(|s| s.invocations).sum(),
            total_failures: tools.values().map(|s| s.failed).sum(),
            tools,
        }
    }

    pub fn reset(&self) {
        self.tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl ExecutionObserver for StatsObserver {
    fn name(&self) -> &str {
        "stats"
    }

    async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError> {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        let stats = tools.entry(record.tool_name.clone()).or_default();
        match record.state {
            ExecutionState::Started => {
                stats.invocations += 1;
                stats.last_started_at = Some(record.timestamp);
            }
            ExecutionState::InProcess => stats.progress_events += 1,
            ExecutionState::Completed | ExecutionState::Failed => {
                if record.state == ExecutionState::Completed {
                    stats.completed += 1;
                } else {
                    stats.failed += 1;
                    stats.last_error = record.error.clone();
                }
                let ms = record.execution_time_ms.unwrap_or(0);
                stats.total_ms += ms;
                stats.max_ms = stats.max_ms.max(ms);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(tool: &str, fail: bool, ms: u64) -> Vec<ExecutionRecord> {
        let started = ExecutionRecord::started("id", tool, serde_json::json!({}));
        let progress = started.transition(ExecutionState::InProcess, "50% complete");
        let terminal = if fail {
            started
                .transition(ExecutionState::Failed, "failed")
                .with_error("execution_failed", "rpc timeout")
        } else {
            started.transition(ExecutionState::Completed, "done")
        }
        .with_execution_time(ms);
        vec![started, progress, terminal]
    }

    #[tokio::test]
    async fn stats_accumulate_per_tool() {
        let stats = StatsObserver::new();
        for record in lifecycle("get_balance", false, 10)
            .into_iter()
            .chain(lifecycle("get_balance", true, 30))
            .chain(lifecycle("list_networks", false, 1))
        {
            stats.on_event(&record).await.unwrap();
        }

        let balance = stats.tool("get_balance").unwrap();
        assert_eq!(balance.invocations, 2);
        assert_eq!(balance.completed, 1);
        assert_eq!(balance.failed, 1);
        assert_eq!(balance.progress_events, 2);
        assert_eq!(balance.max_ms, 30);
        assert!((balance.average_ms() - 20.0).abs() < f64::EPSILON);
        assert_eq!(balance.last_error.as_deref(), Some("rpc timeout"));
        assert_eq!(balance.in_flight(), 0);

        let summary = stats.summary();
        assert_eq!(summary.total_invocations, 3);
        assert_eq!(summary.total_failures, 1);

        stats.reset();
        assert!(stats.tool("get_balance").is_none());
    }

    #[tokio::test]
    async fn in_flight_counts_unfinished_invocations() {
        let stats = StatsObserver::new();
        let started = ExecutionRecord::started("id", "swap", serde_json::json!({}));
        stats.on_event(&started).await.unwrap();
        assert_eq!(stats.tool("swap").unwrap().in_flight(), 1);
        assert_eq!(stats.tool("swap").unwrap().average_ms(), 0.0);
    }

    #[tokio::test]
    async fn broadcast_delivers_to_subscribers() {
        let observer = BroadcastObserver::new(16);
        let mut rx = observer.subscribe();
        let record = ExecutionRecord::started("id-9", "swap", serde_json::json!({}));
        observer.on_event(&record).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, "id-9");
        assert_eq!(received.state, ExecutionState::Started);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_ok() {
        let observer = BroadcastObserver::default();
        let record = ExecutionRecord::started("id", "swap", serde_json::json!({}));
        assert!(observer.on_event(&record).await.is_ok());
    }

    #[tokio::test]
    async fn logging_never_fails() {
        for record in lifecycle("get_balance", true, 5) {
            assert!(LoggingObserver.on_event(&record).await.is_ok());
        }
    }
}
