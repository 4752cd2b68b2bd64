//! Balance plugin: native and token balances through an ordered list of
//! balance providers.
//!
//! `get_balance` walks the candidate providers for the requested network in
//! registration order. A provider that fails its request is skipped and the
//! next one is tried; any other error ends the call.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chainclaw_core::{
    InitializablePlugin, Network, Plugin, PluginConfig, PluginContext, ProgressSink,
    ProgressUpdate, Provider, ProviderError, Tool, ToolError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A balance as reported by a provider. Amounts are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub network: Network,
    pub address: String,
    pub token: String,
    pub amount: String,
    pub provider: String,
}

/// A provider that can read balances.
#[async_trait]
pub trait BalanceProvider: Provider {
    /// Balance of `token` (native asset when `None`) held by `address`.
    async fn get_balance(
        &self,
        network: &Network,
        address: &str,
        token: Option<&str>,
    ) -> Result<Balance, ProviderError>;
}

/// Symbol of the native asset on well-known networks.
pub fn native_symbol(network: &Network) -> &'static str {
    match network.as_str() {
        "bnb" | "bnb-testnet" | "opbnb" | "opbnb-testnet" => "BNB",
        "ethereum" | "base" | "arbitrum" => "ETH",
        "polygon" => "POL",
        "solana" => "SOL",
        _ => "NATIVE",
    }
}

type LedgerKey = (Network, String, String);

/// A balance provider backed by an in-memory table. Unknown holders have a
/// zero balance.
#[derive(Debug)]
pub struct InMemoryLedger {
    name: String,
    networks: BTreeSet<Network>,
    balances: RwLock<BTreeMap<LedgerKey, String>>,
}

impl InMemoryLedger {
    pub fn new(name: impl Into<String>, networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            name: name.into(),
            networks: networks.into_iter().collect(),
            balances: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_balance(
        self,
        network: Network,
        address: &str,
        token: Option<&str>,
        amount: impl Into<String>,
    ) -> Self {
        self.set_balance(network, address, token, amount);
        self
    }

    pub fn set_balance(
        &self,
        network: Network,
        address: &str,
        token: Option<&str>,
        amount: impl Into<String>,
    ) {
        let key = Self::key(&network, address, token);
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, amount.into());
    }

    fn key(network: &Network, address: &str, token: Option<&str>) -> LedgerKey {
        let token = token.unwrap_or_else(|| native_symbol(network));
        (
            network.clone(),
            address.trim().to_ascii_lowercase(),
            token.trim().to_ascii_uppercase(),
        )
    }
}

impl Provider for InMemoryLedger {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_networks(&self) -> BTreeSet<Network> {
        self.networks.clone()
    }
}

#[async_trait]
impl BalanceProvider for InMemoryLedger {
    async fn get_balance(
        &self,
        network: &Network,
        address: &str,
        token: Option<&str>,
    ) -> Result<Balance, ProviderError> {
        if !self.networks.contains(network) {
            return Err(ProviderError::Unsupported {
                provider: self.name.clone(),
                network: network.to_string(),
            });
        }
        let key = Self::key(network, address, token);
        let amount = self
            .balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| "0".to_string());
        Ok(Balance {
            network: network.clone(),
            address: address.to_string(),
            token: key.2,
            amount,
            provider: self.name.clone(),
        })
    }
}

/// Exposes `get_balance`.
pub struct BalancePlugin {
    ctx: Arc<PluginContext<dyn BalanceProvider>>,
    wallet_address: Option<String>,
}

impl BalancePlugin {
    /// An uninitialized plugin; call [`InitializablePlugin::initialize`].
    pub fn new() -> Self {
        Self {
            ctx: Arc::new(PluginContext::new()),
            wallet_address: None,
        }
    }

    /// Address used when a call does not name one.
    pub fn with_wallet_address(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = Some(address.into());
        self
    }
}

impl Default for BalancePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for BalancePlugin {
    fn name(&self) -> &str {
        "balance"
    }

    fn description(&self) -> &str {
        "Native and token balances"
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(GetBalanceTool {
            ctx: Arc::clone(&self.ctx),
            wallet_address: self.wallet_address.clone(),
        })]
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

impl InitializablePlugin for BalancePlugin {
    type Provider = dyn BalanceProvider;

    fn initialize(&self, config: PluginConfig<dyn BalanceProvider>) {
        self.ctx.initialize(self.name(), config);
    }
}

struct GetBalanceTool {
    ctx: Arc<PluginContext<dyn BalanceProvider>>,
    wallet_address: Option<String>,
}

impl GetBalanceTool {
    fn optional_str<'a>(input: &'a serde_json::Value, field: &str) -> Option<&'a str> {
        input
            .get(field)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl Tool for GetBalanceTool {
    fn name(&self) -> &str {
        "get_balance"
    }

    fn description(&self) -> &str {
        "Get the native or token balance of an address. Defaults to the configured wallet and network."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "Holder address (default: the configured wallet address)"
                },
                "network": {
                    "type": "string",
                    "description": "Network name, e.g. bnb or solana"
                },
                "token": {
                    "type": "string",
                    "description": "Token symbol or contract address (default: the native asset)"
                }
            }
        })
    }

    async fn invoke(
        &self,
        input: serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<String, ToolError> {
        let network = self.ctx.resolve_network(&input)?;
        let address = Self::optional_str(&input, "address")
            .or(self.wallet_address.as_deref())
            .ok_or_else(|| {
                ToolError::InvalidArguments(
                    "no address given and no wallet address configured".into(),
                )
            })?;
        let token = Self::optional_str(&input, "token");

        let candidates = self.ctx.require_providers_for_network(&network)?;
        let total = candidates.len();
        let mut last_error = None;

        for (attempt, provider) in candidates.iter().enumerate() {
            progress
                .emit(
                    ProgressUpdate::percent(attempt as f64 * 100.0 / total as f64).with_message(
                        format!("Querying {} ({}/{total})", provider.name(), attempt + 1),
                    ),
                )
                .await;

            match provider.get_balance(&network, address, token).await {
                Ok(balance) => {
                    debug!(provider = %provider.name(), network = %network, "Balance fetched");
                    progress
                        .emit(
                            ProgressUpdate::percent(100.0)
                                .with_message(format!("Balance fetched from {}", provider.name())),
                        )
                        .await;
                    return serde_json::to_string(&balance).map_err(|e| {
                        ToolError::ExecutionFailed {
                            tool_name: self.name().to_string(),
                            reason: e.to_string(),
                        }
                    });
                }
                Err(err @ ProviderError::Request { .. }) => {
                    warn!(
                        provider = %provider.name(),
                        network = %network,
                        error = %err,
                        "Balance provider failed, trying next"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_error
            .unwrap_or(ProviderError::NoProviderAvailable {
                network: network.to_string(),
            })
            .into())
    }
}
