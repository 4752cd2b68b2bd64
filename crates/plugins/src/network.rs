//! Network plugin: which networks are configured and which RPC endpoints
//! serve them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chainclaw_config::AgentSettings;
use chainclaw_core::{
    InitializablePlugin, Network, NetworkKind, Plugin, PluginConfig, PluginContext,
    ProgressSink, Provider, Tool, ToolError,
};
use serde::Serialize;

/// A provider that knows the JSON-RPC endpoint for each of its networks.
pub trait RpcProvider: Provider {
    fn endpoint(&self, network: &Network) -> Option<&str>;
}

/// An RPC provider backed by a fixed network → URL table.
#[derive(Debug, Clone)]
pub struct StaticRpcProvider {
    name: String,
    endpoints: BTreeMap<Network, String>,
}

impl StaticRpcProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoints: BTreeMap::new(),
        }
    }

    pub fn with_endpoint(mut self, network: Network, url: impl Into<String>) -> Self {
        self.endpoints.insert(network, url.into());
        self
    }

    /// The `<NETWORK>_RPC_URL` endpoints from settings, as provider "configured".
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            name: "configured".into(),
            endpoints: settings.rpc_urls.clone(),
        }
    }
}

impl Provider for StaticRpcProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_networks(&self) -> BTreeSet<Network> {
        self.endpoints.keys().cloned().collect()
    }
}

impl RpcProvider for StaticRpcProvider {
    fn endpoint(&self, network: &Network) -> Option<&str> {
        self.endpoints.get(network).map(String::as_str)
    }
}

/// Exposes `list_networks` and `get_network_info`.
pub struct NetworkPlugin {
    ctx: Arc<PluginContext<dyn RpcProvider>>,
}

impl NetworkPlugin {
    /// An uninitialized plugin; call [`InitializablePlugin::initialize`].
    pub fn new() -> Self {
        Self {
            ctx: Arc::new(PluginContext::new()),
        }
    }

    /// A plugin initialized from settings with a single [`StaticRpcProvider`].
    pub fn from_settings(settings: &AgentSettings) -> Self {
        let plugin = Self::new();
        let provider: Arc<dyn RpcProvider> = Arc::new(StaticRpcProvider::from_settings(settings));
        plugin.initialize(
            PluginConfig::new(settings.supported_networks.iter().cloned())
                .with_default_network(settings.default_network.clone())
                .with_provider(provider),
        );
        plugin
    }
}

impl Default for NetworkPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for NetworkPlugin {
    fn name(&self) -> &str {
        "network"
    }

    fn description(&self) -> &str {
        "Configured networks and their RPC endpoints"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(ListNetworksTool {
                ctx: Arc::clone(&self.ctx),
            }),
            Arc::new(NetworkInfoTool {
                ctx: Arc::clone(&self.ctx),
            }),
        ]
    }

    fn supported_networks(&self) -> BTreeSet<Network> {
        self.ctx.supported_networks()
    }

    fn providers_for_network(&self, network: &Network) -> Vec<Arc<dyn Provider>> {
        self.ctx
            .providers_for_network(network)
            .into_iter()
            .map(|p| p as Arc<dyn Provider>)
            .collect()
    }

    fn provider_names(&self) -> Vec<String> {
        self.ctx.provider_names()
    }

    fn default_network(&self) -> Option<Network> {
        self.ctx.default_network()
    }
}

impl InitializablePlugin for NetworkPlugin {
    type Provider = dyn RpcProvider;

    fn initialize(&self, config: PluginConfig<dyn RpcProvider>) {
        self.ctx.initialize(self.name(), config);
    }
}

#[derive(Debug, Serialize)]
struct NetworkSummary {
    network: Network,
    kind: NetworkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
    default: bool,
    providers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EndpointInfo {
    provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
struct NetworkInfo {
    network: Network,
    kind: NetworkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
    default: bool,
    endpoints: Vec<EndpointInfo>,
}

fn to_output<T: Serialize>(tool: &str, value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: e.to_string(),
    })
}

struct ListNetworksTool {
    ctx: Arc<PluginContext<dyn RpcProvider>>,
}

#[async_trait]
impl Tool for ListNetworksTool {
    fn name(&self) -> &str {
        "list_networks"
    }

    fn description(&self) -> &str {
        "List the networks this agent can reach, with chain ids and provider names in preference order."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn invoke(
        &self,
        _input: serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> Result<String, ToolError> {
        let default = self.ctx.default_network();
        let summaries: Vec<NetworkSummary> = self
            .ctx
            .supported_networks()
            .into_iter()
            .map(|network| NetworkSummary {
                kind: network.kind(),
                chain_id: network.chain_id(),
                default: default.as_ref() == Some(&network),
                providers: self
                    .ctx
                    .providers_for_network(&network)
                    .iter()
                    .map(|p| p.name().to_string())
                    .collect(),
                network,
            })
            .collect();
        to_output(self.name(), &summaries)
    }
}

struct NetworkInfoTool {
    ctx: Arc<PluginContext<dyn RpcProvider>>,
}

#[async_trait]
impl Tool for NetworkInfoTool {
    fn name(&self) -> &str {
        "get_network_info"
    }

    fn description(&self) -> &str {
        "Describe one network: kind, chain id and the RPC endpoints that serve it."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "network": {
                    "type": "string",
                    "description": "Network name, e.g. bnb or opbnb (default: the configured default network)"
                }
            }
        })
    }

    async fn invoke(
        &self,
        input: serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> Result<String, ToolError> {
        let network = self.ctx.resolve_network(&input)?;
        let candidates = self.ctx.require_providers_for_network(&network)?;
        let info = NetworkInfo {
            kind: network.kind(),
            chain_id: network.chain_id(),
            default: self.ctx.default_network().as_ref() == Some(&network),
            endpoints: candidates
                .iter()
                .map(|p| EndpointInfo {
                    provider: p.name().to_string(),
                    endpoint: p.endpoint(&network).map(str::to_string),
                })
                .collect(),
            network,
        };
        to_output(self.name(), &info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainclaw_core::{NoopProgress, ProviderError};
    use serde_json::{Value, json};

    fn plugin() -> NetworkPlugin {
        let plugin = NetworkPlugin::new();
        let primary: Arc<dyn RpcProvider> = Arc::new(
            StaticRpcProvider::new("primary")
                .with_endpoint(Network::bnb(), "https://bnb-1")
                .with_endpoint(Network::solana(), "https://sol-1"),
        );
        let backup: Arc<dyn RpcProvider> = Arc::new(
            StaticRpcProvider::new("backup").with_endpoint(Network::bnb(), "https://bnb-2"),
        );
        plugin.initialize(
            PluginConfig::new([Network::bnb(), Network::opbnb()])
                .with_default_network(Network::bnb())
                .with_provider(primary)
                .with_provider(backup),
        );
        plugin
    }

    fn tool(plugin: &NetworkPlugin, name: &str) -> Arc<dyn Tool> {
        plugin
            .tools()
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap()
    }

    #[test]
    fn plugin_delegates_to_registry() {
        let plugin = plugin();
        assert_eq!(plugin.provider_names(), ["primary", "backup"]);
        assert_eq!(plugin.supported_networks(), BTreeSet::from([Network::bnb()]));
        let names: Vec<String> = plugin
            .providers_for_network(&Network::bnb())
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["primary", "backup"]);
        assert!(plugin.providers_for_network(&Network::solana()).is_empty());
    }

    #[tokio::test]
    async fn list_networks_reports_filtered_networks() {
        let plugin = plugin();
        let out = tool(&plugin, "list_networks")
            .invoke(json!({}), &NoopProgress)
            .await
            .unwrap();
        let list: Value = serde_json::from_str(&out).unwrap();
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["network"], "bnb");
        assert_eq!(list[0]["chain_id"], 56);
        assert_eq!(list[0]["kind"], "evm");
        assert_eq!(list[0]["default"], true);
        assert_eq!(list[0]["providers"], json!(["primary", "backup"]));
    }

    #[tokio::test]
    async fn network_info_uses_default_network() {
        let plugin = plugin();
        let out = tool(&plugin, "get_network_info")
            .invoke(json!({}), &NoopProgress)
            .await
            .unwrap();
        let info: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(info["network"], "bnb");
        assert_eq!(info["endpoints"][0]["endpoint"], "https://bnb-1");
        assert_eq!(info["endpoints"][1]["provider"], "backup");
    }

    #[tokio::test]
    async fn network_without_providers_fails_lazily() {
        let plugin = plugin();
        let err = tool(&plugin, "get_network_info")
            .invoke(json!({"network": "opbnb"}), &NoopProgress)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::Provider(ProviderError::NoProviderAvailable {
                network: "opbnb".into()
            })
        );
    }

    #[test]
    fn from_settings_uses_configured_urls() {
        let settings = AgentSettings::default();
        let plugin = NetworkPlugin::from_settings(&settings);
        assert_eq!(plugin.provider_names(), ["configured"]);
        assert_eq!(plugin.default_network(), Some(Network::bnb()));
        assert!(plugin.supported_networks().contains(&Network::solana()));
    }
}
