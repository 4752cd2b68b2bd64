//! Configuration loading and management for ChainClaw.
//!
//! Settings are a flat map of uppercase keys to string values, merged from an
//! ordered list of [`ConfigSource`]s: built-in defaults, then file overlays in
//! the order given, then the live process environment. Later sources win.
//! The explicit source order, never environment enumeration order, decides
//! precedence.

pub mod global;
pub mod settings;
pub mod source;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

pub use settings::AgentSettings;
pub use source::ConfigSource;

/// Normalize a key for storage and lookup.
fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

/// Keys whose values are hidden by [`ConfigStore::redacted_snapshot`].
const SECRET_MARKERS: &[&str] = &["KEY", "SECRET", "PASSWORD", "TOKEN", "MNEMONIC", "PRIVATE"];

/// Layered key/value configuration.
///
/// Thread-safe via `RwLock`; share it as `Arc<ConfigStore>`. The lock is never
/// held across an await point.
pub struct ConfigStore {
    sources: Vec<ConfigSource>,
    values: RwLock<BTreeMap<String, String>>,
}

impl ConfigStore {
    /// Create a store and apply `sources` in order.
    pub fn new(sources: Vec<ConfigSource>) -> Self {
        let store = Self {
            sources,
            values: RwLock::new(BTreeMap::new()),
        };
        store.reload();
        store
    }

    /// A store with no sources; only explicit `set` calls populate it.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The sources this store was built from, lowest priority first.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Clear everything and re-apply every source in declared order.
    ///
    /// Values written with [`set`](Self::set) that no source provides are gone
    /// afterwards.
    pub fn reload(&self) {
        let mut merged = BTreeMap::new();
        for source in &self.sources {
            let layer = source.load();
            debug!(source = %source, keys = layer.len(), "Applied config source");
            for (key, value) in layer {
                merged.insert(normalize_key(&key), value);
            }
        }
        *self.values.write().unwrap_or_else(PoisonError::into_inner) = merged;
    }

    /// Set a value. The key is stored uppercased.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_key(key), value.into());
    }

    /// Get a value, or `None` when no source provides the key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_key(key))
            .cloned()
    }

    /// Get a value or a fallback.
    pub fn get_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Get a value that must be present.
    pub fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(normalize_key(key)))
    }

    /// Interpret a value as a boolean. Absent or unrecognized values yield
    /// `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(raw) => parse_bool(&raw).unwrap_or(default),
            None => default,
        }
    }

    /// Interpret a value as a number. Absent, unparsable or non-finite values
    /// yield `default`.
    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .unwrap_or(default)
    }

    /// Interpret a value as a comma-separated list. Empty items are dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn has(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&normalize_key(key))
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_key(key))
            .is_some()
    }

    /// Remove every key. Sources are kept, so [`reload`](Self::reload)
    /// restores them.
    pub fn clear(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All current values, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Like [`snapshot`](Self::snapshot), with secret-looking values replaced.
    pub fn redacted_snapshot(&self) -> BTreeMap<String, String> {
        self.snapshot()
            .into_iter()
            .map(|(key, value)| {
                if SECRET_MARKERS.iter().any(|m| key.contains(m)) {
                    (key, "[REDACTED]".to_string())
                } else {
                    (key, value)
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("sources", &self.sources)
            .field("values", &self.redacted_snapshot())
            .finish()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration key: {0}")]
    Missing(String),

    #[error("Failed to read config file at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

impl From<ConfigError> for chainclaw_core::Error {
    fn from(err: ConfigError) -> Self {
        chainclaw_core::Error::Config {
            message: err.to_string(),
        }
    }
}
