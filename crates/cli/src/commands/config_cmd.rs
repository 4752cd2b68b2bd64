//! `chainclaw config`: Inspect the merged configuration.

use anyhow::bail;
use chainclaw_config::ConfigStore;

/// Print every key, lowest-priority source first in the header.
pub fn show(store: &ConfigStore) {
    println!("# Sources (later wins):");
    for source in store.sources() {
        println!("#   {source}");
    }
    for (key, value) in store.redacted_snapshot() {
        println!("{key}={value}");
    }
}

pub fn get(store: &ConfigStore, key: &str) -> anyhow::Result<()> {
    match store.get(key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => bail!("'{}' is not set", key.to_ascii_uppercase()),
    }
}
