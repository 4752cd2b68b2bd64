//! Networks: the blockchain environments providers operate against.
//!
//! A network is identified by a lowercase name. Well-known names carry a
//! [`NetworkKind`] and, for EVM chains, a chain id; unknown names are still
//! valid networks, they just have no metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a network speaks the EVM JSON-RPC dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Evm,
    NonEvm,
    Unknown,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkKind::Evm => write!(f, "evm"),
            NetworkKind::NonEvm => write!(f, "non-evm"),
            NetworkKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// (name, kind, chain id)
const KNOWN_NETWORKS: &[(&str, NetworkKind, Option<u64>)] = &[
    ("bnb", NetworkKind::Evm, Some(56)),
    ("bnb-testnet", NetworkKind::Evm, Some(97)),
    ("opbnb", NetworkKind::Evm, Some(204)),
    ("opbnb-testnet", NetworkKind::Evm, Some(5611)),
    ("ethereum", NetworkKind::Evm, Some(1)),
    ("base", NetworkKind::Evm, Some(8453)),
    ("arbitrum", NetworkKind::Evm, Some(42161)),
    ("polygon", NetworkKind::Evm, Some(137)),
    ("solana", NetworkKind::NonEvm, None),
];

/// A named blockchain network, e.g. `bnb` or `solana`.
///
/// Names are normalized to lowercase so `"BNB"` and `"bnb"` are the same network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Network(String);

impl Network {
    /// Create a network from a name. Surrounding whitespace is trimmed.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn bnb() -> Self {
        Self::new("bnb")
    }

    pub fn opbnb() -> Self {
        Self::new("opbnb")
    }

    pub fn ethereum() -> Self {
        Self::new("ethereum")
    }

    pub fn solana() -> Self {
        Self::new("solana")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn known(&self) -> Option<&'static (&'static str, NetworkKind, Option<u64>)> {
        KNOWN_NETWORKS.iter().find(|(name, _, _)| *name == self.0)
    }

    pub fn kind(&self) -> NetworkKind {
        self.known().map(|k| k.1).unwrap_or(NetworkKind::Unknown)
    }

    /// EVM chain id for well-known EVM networks.
    pub fn chain_id(&self) -> Option<u64> {
        self.known().and_then(|k| k.2)
    }

    pub fn is_evm(&self) -> bool {
        self.kind() == NetworkKind::Evm
    }

    /// Environment-style key fragment, e.g. `bnb-testnet` → `BNB_TESTNET`.
    pub fn env_key(&self) -> String {
        self.0.replace('-', "_").to_ascii_uppercase()
    }

    /// All networks this crate has metadata for.
    pub fn well_known() -> Vec<Network> {
        KNOWN_NETWORKS.iter().map(|(name, _, _)| Network::new(name)).collect()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let network = Network::new(s);
        if network.0.is_empty() {
            return Err("network name must not be empty".into());
        }
        Ok(network)
    }
}

impl TryFrom<String> for Network {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.0
    }
}

impl From<&str> for Network {
    fn from(name: &str) -> Self {
        Network::new(name)
    }
}
