//! Typed settings read out of a [`ConfigStore`].
//!
//! Environment-style names:
//! - `CHAINCLAW_DEFAULT_NETWORK` (default `bnb`)
//! - `CHAINCLAW_SUPPORTED_NETWORKS` (comma list)
//! - `CHAINCLAW_LOG_LEVEL`, `CHAINCLAW_LOG_JSON`
//! - `CHAINCLAW_WALLET_ADDRESS`
//! - `<NETWORK>_RPC_URL`, e.g. `BNB_RPC_URL`, `OPBNB_TESTNET_RPC_URL`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chainclaw_core::Network;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ConfigSource, ConfigStore};

pub const DEFAULT_NETWORK_KEY: &str = "CHAINCLAW_DEFAULT_NETWORK";
pub const SUPPORTED_NETWORKS_KEY: &str = "CHAINCLAW_SUPPORTED_NETWORKS";
pub const LOG_LEVEL_KEY: &str = "CHAINCLAW_LOG_LEVEL";
pub const LOG_JSON_KEY: &str = "CHAINCLAW_LOG_JSON";
pub const WALLET_ADDRESS_KEY: &str = "CHAINCLAW_WALLET_ADDRESS";

fn default_network() -> Network {
    Network::bnb()
}
fn default_supported_networks() -> Vec<Network> {
    vec![
        Network::bnb(),
        Network::opbnb(),
        Network::ethereum(),
        Network::solana(),
    ]
}
fn default_log_level() -> String {
    "info".into()
}

/// Public RPC endpoints used when no `<NETWORK>_RPC_URL` is configured.
fn default_rpc_urls() -> BTreeMap<String, String> {
    [
        ("BNB_RPC_URL", "https://bsc-dataseed.bnbchain.org"),
        ("BNB_TESTNET_RPC_URL", "https://data-seed-prebsc-1-s1.bnbchain.org:8545"),
        ("OPBNB_RPC_URL", "https://opbnb-mainnet-rpc.bnbchain.org"),
        ("OPBNB_TESTNET_RPC_URL", "https://opbnb-testnet-rpc.bnbchain.org"),
        ("ETHEREUM_RPC_URL", "https://ethereum-rpc.publicnode.com"),
        ("SOLANA_RPC_URL", "https://api.mainnet-beta.solana.com"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// The built-in defaults layer.
pub fn defaults() -> BTreeMap<String, String> {
    let mut values = default_rpc_urls();
    values.insert(DEFAULT_NETWORK_KEY.into(), default_network().to_string());
    values.insert(
        SUPPORTED_NETWORKS_KEY.into(),
        default_supported_networks()
            .iter()
            .map(Network::to_string)
            .collect::<Vec<_>>()
            .join(","),
    );
    values.insert(LOG_LEVEL_KEY.into(), default_log_level());
    values.insert(LOG_JSON_KEY.into(), "false".into());
    values
}

/// Get the configuration directory path (`~/.chainclaw`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".chainclaw")
}

/// The standard source list: defaults → `~/.chainclaw/config.toml` →
/// `./.env` → `extra_env_files` in order → process environment.
pub fn default_sources(extra_env_files: &[PathBuf]) -> Vec<ConfigSource> {
    let mut sources = vec![
        ConfigSource::defaults(defaults()),
        ConfigSource::toml_file(config_dir().join("config.toml")),
        ConfigSource::env_file(Path::new(".env")),
    ];
    sources.extend(extra_env_files.iter().cloned().map(ConfigSource::EnvFile));
    sources.push(ConfigSource::environment());
    sources
}

/// Settings the agent and built-in plugins need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_network")]
    pub default_network: Network,

    #[serde(default = "default_supported_networks")]
    pub supported_networks: Vec<Network>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// network → RPC endpoint
    #[serde(default)]
    pub rpc_urls: BTreeMap<Network, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl AgentSettings {
    /// Read settings from a store. Invalid values fall back to defaults with
    /// a warning; this never fails.
    pub fn from_store(store: &ConfigStore) -> Self {
        let default_network = match store.get(DEFAULT_NETWORK_KEY) {
            Some(raw) => raw.parse::<Network>().unwrap_or_else(|e| {
                warn!(key = DEFAULT_NETWORK_KEY, error = %e, "Invalid default network");
                default_network()
            }),
            None => default_network(),
        };

        let listed: Vec<Network> = match store.get_list(SUPPORTED_NETWORKS_KEY) {
            Some(names) if !names.is_empty() => names.iter().map(Network::new).collect(),
            _ => default_supported_networks(),
        };
        let mut supported_networks: Vec<Network> = Vec::with_capacity(listed.len());
        for network in listed {
            if !supported_networks.contains(&network) {
                supported_networks.push(network);
            }
        }
        if !supported_networks.contains(&default_network) {
            warn!(
                network = %default_network,
                "Default network is not in the supported list, adding it"
            );
            supported_networks.push(default_network.clone());
        }

        let rpc_urls = supported_networks
            .iter()
            .filter_map(|network| {
                let key = format!("{}_RPC_URL", network.env_key());
                store
                    .get(&key)
                    .filter(|url| !url.trim().is_empty())
                    .map(|url| (network.clone(), url))
            })
            .collect();

        Self {
            default_network,
            supported_networks,
            log_level: store.get_or(LOG_LEVEL_KEY, default_log_level()),
            log_json: store.get_bool(LOG_JSON_KEY, false),
            rpc_urls,
            wallet_address: store
                .get(WALLET_ADDRESS_KEY)
                .filter(|addr| !addr.trim().is_empty()),
        }
    }

    pub fn rpc_url(&self, network: &Network) -> Option<&str> {
        self.rpc_urls.get(network).map(String::as_str)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_store(&ConfigStore::new(vec![ConfigSource::defaults(defaults())]))
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}
