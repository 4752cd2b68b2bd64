//! Built-in plugins for ChainClaw.
//!
//! - [`NetworkPlugin`]: configured networks and RPC endpoints
//!   (`list_networks`, `get_network_info`)
//! - [`BalancePlugin`]: balances through ordered providers (`get_balance`)
//!
//! Other crates add capabilities by implementing [`chainclaw_core::Plugin`]
//! the same way.

pub mod balance;
pub mod network;

use std::sync::Arc;

use chainclaw_config::AgentSettings;
use chainclaw_core::{InitializablePlugin, Plugin, PluginConfig};

pub use balance::{Balance, BalancePlugin, BalanceProvider, InMemoryLedger, native_symbol};
pub use network::{NetworkPlugin, RpcProvider, StaticRpcProvider};

/// Create the built-in plugins, initialized from `settings`.
///
/// The balance plugin is backed by an empty [`InMemoryLedger`] until real
/// balance providers are registered through
/// [`InitializablePlugin::initialize`].
pub fn builtin_plugins(settings: &AgentSettings) -> Vec<Arc<dyn Plugin>> {
    let network = NetworkPlugin::from_settings(settings);

    let mut balance = BalancePlugin::new();
    if let Some(address) = &settings.wallet_address {
        balance = balance.with_wallet_address(address.clone());
    }
    let ledger: Arc<dyn BalanceProvider> = Arc::new(InMemoryLedger::new(
        "ledger",
        settings.supported_networks.iter().cloned(),
    ));
    balance.initialize(
        PluginConfig::new(settings.supported_networks.iter().cloned())
            .with_default_network(settings.default_network.clone())
            .with_provider(ledger),
    );

    vec![Arc::new(network), Arc::new(balance)]
}
