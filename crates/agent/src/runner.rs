//! The agent: registers plugins and runs their tools with telemetry.

use std::sync::Arc;

use chainclaw_core::{NoopProgress, Plugin, ProgressSink, ToolCall, ToolRegistry};
use chainclaw_telemetry::{CallbackManager, wrap_tool};
use tracing::{debug, info};

use crate::error::AgentError;
use crate::intent::{IntentResolver, KeywordResolver};

/// Orchestrates plugins: every tool a plugin exposes is wrapped so its
/// invocations are reported to the agent's [`CallbackManager`].
pub struct Agent {
    /// Shared with the CLI and anything else that registers observers
    callbacks: Arc<CallbackManager>,

    /// Registered plugins in registration order
    plugins: Vec<Arc<dyn Plugin>>,

    /// Wrapped tools, together with the plugin that owns each
    tools: ToolRegistry,
    owners: Vec<(String, String)>,

    /// Chooses a tool for free text
    resolver: Box<dyn IntentResolver>,
}

impl Agent {
    /// Create an agent with no plugins and the [`KeywordResolver`].
    pub fn new(callbacks: Arc<CallbackManager>) -> Self {
        Self {
            callbacks,
            plugins: Vec::new(),
            tools: ToolRegistry::new(),
            owners: Vec::new(),
            resolver: Box::new(KeywordResolver::new()),
        }
    }

    /// Replace the intent resolver.
    pub fn with_resolver(mut self, resolver: impl IntentResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn callbacks(&self) -> &Arc<CallbackManager> {
        &self.callbacks
    }

    /// Register a plugin and expose its tools.
    ///
    /// Plugin names and tool names must be unique across the agent; on a
    /// conflict nothing is registered.
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), AgentError> {
        if self.plugin(plugin.name()).is_some() {
            return Err(AgentError::DuplicatePlugin(plugin.name().to_string()));
        }

        let tools = plugin.tools();
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(AgentError::ToolConflict {
                    tool: tool.name().to_string(),
                    plugin: plugin.name().to_string(),
                    existing: plugin.name().to_string(),
                });
            }
            if let Some(existing) = self.owner_of(tool.name()) {
                return Err(AgentError::ToolConflict {
                    tool: tool.name().to_string(),
                    plugin: plugin.name().to_string(),
                    existing: existing.to_string(),
                });
            }
        }

        for tool in tools {
            debug!(plugin = %plugin.name(), tool = %tool.name(), "Registering tool");
            self.owners
                .push((tool.name().to_string(), plugin.name().to_string()));
            self.tools.register(wrap_tool(tool, Arc::clone(&self.callbacks)));
        }
        info!(
            plugin = %plugin.name(),
            networks = ?plugin.supported_networks(),
            tools = self.tools.len(),
            "Registered plugin"
        );
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn plugin(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// The wrapped tools, in registration order.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.names().into_iter().map(str::to_string).collect()
    }

    /// Name of the plugin that provides `tool`.
    pub fn owner_of(&self, tool: &str) -> Option<&str> {
        self.owners
            .iter()
            .find(|(t, _)| t == tool)
            .map(|(_, plugin)| plugin.as_str())
    }

    /// Validate `input` against the tool's schema, then run the wrapped tool.
    pub async fn invoke(&self, name: &str, input: serde_json::Value) -> Result<String, AgentError> {
        self.invoke_with_progress(name, input, &NoopProgress).await
    }

    /// Like [`invoke`](Self::invoke), also forwarding progress to `progress`.
    pub async fn invoke_with_progress(
        &self,
        name: &str,
        input: serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<String, AgentError> {
        if self.tools.get(name).is_none() {
            return Err(AgentError::UnknownTool(name.to_string()));
        }
        let call = ToolCall {
            name: name.to_string(),
            arguments: input,
        };
        Ok(self.tools.execute(&call, progress).await?)
    }

    /// Resolve free text to a tool call without running it.
    pub async fn resolve(&self, text: &str) -> Result<ToolCall, AgentError> {
        self.resolver
            .resolve(text, &self.tools.definitions())
            .await
            .ok_or_else(|| AgentError::Unresolved(text.to_string()))
    }

    /// Resolve free text to a tool call and run it.
    pub async fn ask(&self, text: &str) -> Result<String, AgentError> {
        let call = self.resolve(text).await?;
        info!(tool = %call.name, "Answering with tool");
        self.invoke(&call.name, call.arguments).await
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("tools", &self.tools.names())
            .field("observers", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chainclaw_core::{ExecutionRecord, ExecutionState, Network, Provider, Tool, ToolError};
    use chainclaw_telemetry::{ExecutionObserver, ObserverError};
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "Echo the message field"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            })
        }
        async fn invoke(
            &self,
            input: serde_json::Value,
            _progress: &dyn ProgressSink,
        ) -> Result<String, ToolError> {
            Ok(input["message"].as_str().unwrap_or_default().to_string())
        }
    }

    struct EchoPlugin {
        name: &'static str,
        tools: Vec<&'static str>,
    }

    impl Plugin for EchoPlugin {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "echo"
        }
        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            self.tools
                .iter()
                .map(|n| Arc::new(Echo(*n)) as Arc<dyn Tool>)
                .collect()
        }
        fn supported_networks(&self) -> BTreeSet<Network> {
            BTreeSet::new()
        }
        fn providers_for_network(&self, _network: &Network) -> Vec<Arc<dyn Provider>> {
            Vec::new()
        }
        fn provider_names(&self) -> Vec<String> {
            Vec::new()
        }
        fn default_network(&self) -> Option<Network> {
            None
        }
    }

    #[derive(Default)]
    struct States(Mutex<Vec<ExecutionState>>);

    #[async_trait]
    impl ExecutionObserver for States {
        async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError> {
            self.0.lock().unwrap().push(record.state);
            Ok(())
        }
    }

    fn agent() -> (Agent, Arc<States>) {
        let callbacks = Arc::new(CallbackManager::new());
        let states = Arc::new(States::default());
        callbacks.register(states.clone());
        let mut agent = Agent::new(callbacks);
        agent
            .register_plugin(Arc::new(EchoPlugin {
                name: "echo",
                tools: vec!["echo", "shout"],
            }))
            .unwrap();
        (agent, states)
    }

    #[tokio::test]
    async fn invoke_runs_wrapped_tool() {
        let (agent, states) = agent();
        let out = agent.invoke("echo", json!({"message": "hi"})).await.unwrap();
        assert_eq!(out, "hi");
        assert_eq!(
            *states.0.lock().unwrap(),
            [ExecutionState::Started, ExecutionState::Completed]
        );
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_the_call() {
        let (agent, states) = agent();
        let err = agent.invoke("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::Tool(ToolError::InvalidArguments(_))));
        assert!(states.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool() {
        let (agent, _) = agent();
        let err = agent.invoke("nope", json!({})).await.unwrap_err();
        assert_eq!(err, AgentError::UnknownTool("nope".into()));
    }

    #[test]
    fn registration_tracks_plugins_and_owners() {
        let (agent, _) = agent();
        assert_eq!(agent.tool_names(), ["echo", "shout"]);
        assert_eq!(agent.owner_of("shout"), Some("echo"));
        assert_eq!(agent.plugins().len(), 1);
        assert!(agent.plugin("echo").is_some());
    }

    #[test]
    fn conflicts_register_nothing() {
        let (mut agent, _) = agent();
        let err = agent
            .register_plugin(Arc::new(EchoPlugin {
                name: "echo",
                tools: vec![],
            }))
            .unwrap_err();
        assert_eq!(err, AgentError::DuplicatePlugin("echo".into()));

        let err = agent
            .register_plugin(Arc::new(EchoPlugin {
                name: "loud",
                tools: vec!["whisper", "shout"],
            }))
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolConflict { ref existing, .. } if existing == "echo"));
        assert_eq!(agent.tool_names(), ["echo", "shout"]);
        assert_eq!(agent.plugins().len(), 1);
    }

    #[test]
    fn duplicate_tool_within_a_plugin_is_rejected() {
        let (mut agent, _) = agent();
        let err = agent
            .register_plugin(Arc::new(EchoPlugin {
                name: "twice",
                tools: vec!["repeat", "repeat"],
            }))
            .unwrap_err();
        assert_eq!(
            err,
            AgentError::ToolConflict {
                tool: "repeat".into(),
                plugin: "twice".into(),
                existing: "twice".into(),
            }
        );
        assert!(agent.owner_of("repeat").is_none());
        assert!(agent.plugin("twice").is_none());
        assert_eq!(agent.tool_names(), ["echo", "shout"]);
    }

    #[tokio::test]
    async fn ask_uses_the_resolver() {
        struct Fixed;

        #[async_trait]
        impl IntentResolver for Fixed {
            async fn resolve(
                &self,
                text: &str,
                _tools: &[chainclaw_core::ToolDefinition],
            ) -> Option<ToolCall> {
                (!text.is_empty()).then(|| ToolCall {
                    name: "shout".into(),
                    arguments: json!({"message": text}),
                })
            }
        }

        let (agent, _) = agent();
        let agent = agent.with_resolver(Fixed);
        assert_eq!(agent.ask("hello").await.unwrap(), "hello");
        assert_eq!(
            agent.ask("").await.unwrap_err(),
            AgentError::Unresolved(String::new())
        );
    }
}
