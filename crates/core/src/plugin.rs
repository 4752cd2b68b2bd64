//! Plugin traits: bundles of related tools backed by a provider registry.
//!
//! A plugin is initialized once with a [`PluginConfig`] (default network,
//! providers, supported networks) and then exposes its tools. The provider
//! registry lives in a shared [`PluginContext`] so tools created by the plugin
//! always see the current registry.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::error::{ProviderError, ToolError};
use crate::network::Network;
use crate::provider::{Provider, ProviderRegistry};
use crate::tool::Tool;

/// Initialization input for a plugin whose providers are of kind `P`.
pub struct PluginConfig<P: ?Sized> {
    /// Network used when a tool call does not name one.
    pub default_network: Option<Network>,

    /// Providers in preference order (first registered = first tried).
    pub providers: Vec<Arc<P>>,

    /// Networks this plugin serves; providers are filtered against this list.
    pub supported_networks: Vec<Network>,
}

impl<P: ?Sized> PluginConfig<P> {
    pub fn new(supported_networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            default_network: None,
            providers: Vec::new(),
            supported_networks: supported_networks.into_iter().collect(),
        }
    }

    pub fn with_default_network(mut self, network: Network) -> Self {
        self.default_network = Some(network);
        self
    }

    pub fn with_provider(mut self, provider: Arc<P>) -> Self {
        self.providers.push(provider);
        self
    }
}

/// The object-safe face of a plugin, as seen by the agent.
pub trait Plugin: Send + Sync {
    /// Unique plugin name (e.g. "balance").
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// The tools this plugin exposes.
    fn tools(&self) -> Vec<Arc<dyn Tool>>;

    /// Networks served by at least one admitted provider, within the
    /// configured filter.
    fn supported_networks(&self) -> BTreeSet<Network>;

    /// Candidate providers for `network` in preference order.
    fn providers_for_network(&self, network: &Network) -> Vec<Arc<dyn Provider>>;

    /// Registered provider names in registration order.
    fn provider_names(&self) -> Vec<String>;

    fn default_network(&self) -> Option<Network>;
}

/// A plugin that can be (re)initialized with providers of one kind.
pub trait InitializablePlugin: Plugin {
    type Provider: ?Sized + Provider;

    /// Build the provider registry from `config`. Calling this again rebuilds
    /// the registry from scratch.
    fn initialize(&self, config: PluginConfig<Self::Provider>);
}

/// Shared, lock-protected state of one plugin: its provider registry and
/// default network.
pub struct PluginContext<P: ?Sized + Provider> {
    registry: RwLock<ProviderRegistry<P>>,
    default_network: RwLock<Option<Network>>,
}

impl<P: ?Sized + Provider> PluginContext<P> {
    /// An uninitialized context: no providers, no default network.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(ProviderRegistry::new()),
            default_network: RwLock::new(None),
        }
    }

    /// Replace the registry with one built from `config`.
    ///
    /// An empty effective provider set is not an error here; tools fail with
    /// `NoProviderAvailable` when they actually need the network.
    pub fn initialize(&self, plugin: &str, config: PluginConfig<P>) {
        let registry =
            ProviderRegistry::from_providers(config.supported_networks, config.providers);
        info!(
            plugin = %plugin,
            providers = ?registry.provider_names(),
            networks = ?registry.supported_networks(),
            "Initialized plugin"
        );
        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = registry;
        *self
            .default_network
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config.default_network;
    }

    /// A snapshot of the current registry.
    pub fn registry(&self) -> ProviderRegistry<P> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_provider(&self, name: &str) -> Result<Arc<P>, ProviderError> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_provider(name)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .provider_names()
    }

    pub fn providers_for_network(&self, network: &Network) -> Vec<Arc<P>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .providers_for_network(network)
    }

    pub fn require_providers_for_network(
        &self,
        network: &Network,
    ) -> Result<Vec<Arc<P>>, ProviderError> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .require_providers_for_network(network)
    }

    pub fn supported_networks(&self) -> BTreeSet<Network> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .supported_networks()
    }

    pub fn default_network(&self) -> Option<Network> {
        self.default_network
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Network for a tool call: the input's `"network"` field, else the
    /// plugin default.
    pub fn resolve_network(&self, input: &serde_json::Value) -> Result<Network, ToolError> {
        resolve_network(input, self.default_network().as_ref())
    }
}

impl<P: ?Sized + Provider> Default for PluginContext<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read an optional `"network"` field from a tool input, falling back to
/// `default`.
pub fn resolve_network(
    input: &serde_json::Value,
    default: Option<&Network>,
) -> Result<Network, ToolError> {
    match input.get("network") {
        Some(serde_json::Value::String(name)) => name
            .parse()
            .map_err(|e: String| ToolError::InvalidArguments(format!("network: {e}"))),
        Some(serde_json::Value::Null) | None => default.cloned().ok_or_else(|| {
            ToolError::InvalidArguments("no network given and no default network configured".into())
        }),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "network must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct P(&'static str, &'static [&'static str]);

    impl Provider for P {
        fn name(&self) -> &str {
            self.0
        }
        fn supported_networks(&self) -> BTreeSet<Network> {
            self.1.iter().map(Network::new).collect()
        }
    }

    #[test]
    fn context_initialize_applies_filter() {
        let ctx: PluginContext<dyn Provider> = PluginContext::new();
        let config = PluginConfig::new([Network::bnb()])
            .with_default_network(Network::bnb())
            .with_provider(Arc::new(P("p1", &["bnb"])) as Arc<dyn Provider>)
            .with_provider(Arc::new(P("p2", &["bnb", "solana"])) as Arc<dyn Provider>);
        ctx.initialize("test", config);

        assert_eq!(ctx.provider_names(), ["p1", "p2"]);
        assert_eq!(ctx.supported_networks(), BTreeSet::from([Network::bnb()]));
        assert!(ctx.providers_for_network(&Network::solana()).is_empty());
        assert_eq!(ctx.default_network(), Some(Network::bnb()));
    }

    #[test]
    fn reinitialize_rebuilds_from_scratch() {
        let ctx: PluginContext<dyn Provider> = PluginContext::new();
        let provider = |name| Arc::new(P(name, &["bnb"])) as Arc<dyn Provider>;
        ctx.initialize(
            "test",
            PluginConfig::new([Network::bnb()]).with_provider(provider("old")),
        );
        ctx.initialize(
            "test",
            PluginConfig::new([Network::bnb()]).with_provider(provider("new")),
        );
        assert_eq!(ctx.provider_names(), ["new"]);
        assert!(ctx.default_network().is_none());
    }

    #[test]
    fn empty_network_fails_lazily() {
        let ctx: PluginContext<dyn Provider> = PluginContext::new();
        ctx.initialize("test", PluginConfig::new([Network::solana()]));
        let err = ctx
            .require_providers_for_network(&Network::solana())
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::NoProviderAvailable { .. }));
    }

    #[test]
    fn resolve_network_prefers_input() {
        let default = Network::bnb();
        let net = resolve_network(&json!({"network": "Solana"}), Some(&default)).unwrap();
        assert_eq!(net, Network::solana());

        let net = resolve_network(&json!({}), Some(&default)).unwrap();
        assert_eq!(net, Network::bnb());
    }

    #[test]
    fn resolve_network_without_default_fails() {
        let err = resolve_network(&json!({}), None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        let err = resolve_network(&json!({"network": 5}), None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
