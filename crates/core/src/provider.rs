//! Provider trait and the per-plugin provider registry.
//!
//! A Provider is an implementation object that can perform operations against
//! one or more networks (an RPC endpoint, an explorer API, a DEX aggregator).
//! The core only needs its name and its supported networks; kind-specific
//! operations live on sub-traits defined next to the plugins that use them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ProviderError;
use crate::network::Network;

/// The core Provider trait.
///
/// Providers are created and owned by caller code and shared into registries
/// as `Arc`s; the same provider may back several plugins.
pub trait Provider: Send + Sync {
    /// Name of this provider, unique within a plugin (e.g. "bscscan").
    fn name(&self) -> &str;

    /// Every network this provider claims to support.
    fn supported_networks(&self) -> BTreeSet<Network>;

    /// Whether this provider claims `network`.
    fn supports(&self, network: &Network) -> bool {
        self.supported_networks().contains(network)
    }
}

/// A registry of providers for one plugin, plus the derived
/// network → providers index.
///
/// `P` is the provider kind the plugin works with, usually a trait object
/// such as `dyn BalanceProvider`.
///
/// Ordering is registration order everywhere: the first registered provider
/// for a network is the first candidate returned. The registry never picks a
/// "best" provider; callers decide among the candidates.
pub struct ProviderRegistry<P: ?Sized + Provider> {
    /// Admitted providers in registration order.
    providers: Vec<Arc<P>>,

    /// Networks the owning plugin is configured for. `None` admits everything.
    filter: Option<BTreeSet<Network>>,

    /// network → providers, derived from `providers` and `filter`.
    index: BTreeMap<Network, Vec<Arc<P>>>,
}

impl<P: ?Sized + Provider> ProviderRegistry<P> {
    /// Create an empty registry that admits providers for any network.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            filter: None,
            index: BTreeMap::new(),
        }
    }

    /// Create an empty registry restricted to `networks`.
    ///
    /// Providers whose networks do not intersect the filter are not admitted,
    /// and networks outside the filter never get an index bucket.
    pub fn with_network_filter(networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            providers: Vec::new(),
            filter: Some(networks.into_iter().collect()),
            index: BTreeMap::new(),
        }
    }

    /// Build a registry from a filter and providers in one step.
    pub fn from_providers(
        networks: impl IntoIterator<Item = Network>,
        providers: impl IntoIterator<Item = Arc<P>>,
    ) -> Self {
        let mut registry = Self::with_network_filter(networks);
        for provider in providers {
            registry.register_provider(provider);
        }
        registry
    }

    /// The configured network filter, if any.
    pub fn network_filter(&self) -> Option<&BTreeSet<Network>> {
        self.filter.as_ref()
    }

    /// Networks of `provider` that survive the filter.
    fn effective_networks(&self, provider: &P) -> BTreeSet<Network> {
        let claimed = provider.supported_networks();
        match &self.filter {
            Some(filter) => claimed.intersection(filter).cloned().collect(),
            None => claimed,
        }
    }

    /// Register a provider. Idempotent by name: re-registering a name replaces
    /// the existing entry in place, keeping its original position.
    ///
    /// Returns `false` when the provider has no network in common with the
    /// filter and was therefore not admitted. A previously registered
    /// provider with the same name is removed in that case.
    pub fn register_provider(&mut self, provider: Arc<P>) -> bool {
        let name = provider.name().to_string();
        if self.effective_networks(&provider).is_empty() {
            debug!(provider = %name, "Provider supports no configured network, skipping");
            let before = self.providers.len();
            self.providers.retain(|p| p.name() != name);
            if self.providers.len() < before {
                self.rebuild_index();
            }
            return false;
        }

        match self.providers.iter().position(|p| p.name() == name) {
            Some(pos) => {
                debug!(provider = %name, "Replacing registered provider");
                self.providers[pos] = provider;
            }
            None => {
                info!(provider = %name, "Registered provider");
                self.providers.push(provider);
            }
        }
        self.rebuild_index();
        true
    }

    /// Rebuild the network index: each admitted provider is visited once, in
    /// registration order, and appended to every bucket it effectively supports.
    fn rebuild_index(&mut self) {
        let mut index: BTreeMap<Network, Vec<Arc<P>>> = BTreeMap::new();
        for provider in &self.providers {
            for network in self.effective_networks(provider) {
                index.entry(network).or_default().push(Arc::clone(provider));
            }
        }
        self.index = index;
    }

    /// Get a provider by name.
    pub fn get_provider(&self, name: &str) -> Result<Arc<P>, ProviderError> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    /// Provider names in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// All admitted providers in registration order.
    pub fn providers(&self) -> &[Arc<P>] {
        &self.providers
    }

    /// Candidate providers for `network`, in registration order.
    /// Empty when no admitted provider serves it.
    pub fn providers_for_network(&self, network: &Network) -> Vec<Arc<P>> {
        self.index.get(network).cloned().unwrap_or_default()
    }

    /// Like [`providers_for_network`](Self::providers_for_network), but an
    /// empty candidate list is an error. Tools call this at the point they
    /// actually need a provider.
    pub fn require_providers_for_network(
        &self,
        network: &Network,
    ) -> Result<Vec<Arc<P>>, ProviderError> {
        let candidates = self.providers_for_network(network);
        if candidates.is_empty() {
            return Err(ProviderError::NoProviderAvailable {
                network: network.to_string(),
            });
        }
        Ok(candidates)
    }

    /// Union of admitted providers' networks, intersected with the filter.
    pub fn supported_networks(&self) -> BTreeSet<Network> {
        self.index.keys().cloned().collect()
    }

    /// Number of admitted providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider has been admitted.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<P: ?Sized + Provider> Default for ProviderRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized + Provider> Clone for ProviderRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
            filter: self.filter.clone(),
            index: self.index.clone(),
        }
    }
}

impl<P: ?Sized + Provider> fmt::Debug for ProviderRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .field("filter", &self.filter)
            .field("networks", &self.supported_networks())
            .finish()
    }
}
