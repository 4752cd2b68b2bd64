//! Subcommand implementations.

pub mod config_cmd;
pub mod invoke;
pub mod networks;
pub mod tools;

use std::sync::Arc;

use chainclaw_agent::Agent;
use chainclaw_config::AgentSettings;
use chainclaw_core::ExecutionRecord;
use chainclaw_plugins::builtin_plugins;
use chainclaw_telemetry::{CallbackManager, FnObserver, LoggingObserver, ObserverError};
use tracing::info;

/// Build an agent with the built-in plugins and the logging observer. With
/// `watch`, every lifecycle record is also printed to stderr as a JSON line.
pub fn build_agent(settings: &AgentSettings, watch: bool) -> anyhow::Result<Agent> {
    let callbacks = Arc::new(CallbackManager::new());
    callbacks.register(Arc::new(LoggingObserver));
    if watch {
        callbacks.register(Arc::new(FnObserver::new("watch", |record: &ExecutionRecord| {
            let line = serde_json::to_string(record)
                .map_err(|e| ObserverError::failed(e.to_string()))?;
            eprintln!("{line}");
            Ok(())
        })));
    }

    let mut agent = Agent::new(callbacks);
    for plugin in builtin_plugins(settings) {
        agent.register_plugin(plugin)?;
    }
    info!(
        network = %settings.default_network,
        plugins = agent.plugins().len(),
        tools = agent.tools().len(),
        "Agent ready"
    );
    Ok(agent)
}
