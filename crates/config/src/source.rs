//! Configuration sources: one layer of the merged configuration each.
//!
//! Loading a source never fails: missing files are skipped, malformed files
//! are reported with a warning and contribute whatever parsed cleanly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ConfigError;

/// One layer of configuration.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Built-in defaults, normally the first layer.
    Defaults(BTreeMap<String, String>),

    /// A `KEY=value` env-style file.
    EnvFile(PathBuf),

    /// A TOML file; nested tables flatten to `TABLE_KEY`.
    TomlFile(PathBuf),

    /// The live process environment, optionally limited to keys that start
    /// with `prefix` (compared uppercased). Normally the last layer.
    Environment { prefix: Option<String> },

    /// An explicit in-memory overlay.
    Map {
        name: String,
        values: BTreeMap<String, String>,
    },
}

impl ConfigSource {
    pub fn defaults(values: BTreeMap<String, String>) -> Self {
        ConfigSource::Defaults(values)
    }

    pub fn env_file(path: impl Into<PathBuf>) -> Self {
        ConfigSource::EnvFile(path.into())
    }

    pub fn toml_file(path: impl Into<PathBuf>) -> Self {
        ConfigSource::TomlFile(path.into())
    }

    pub fn environment() -> Self {
        ConfigSource::Environment { prefix: None }
    }

    pub fn environment_with_prefix(prefix: impl Into<String>) -> Self {
        ConfigSource::Environment {
            prefix: Some(prefix.into()),
        }
    }

    pub fn map(name: impl Into<String>, values: BTreeMap<String, String>) -> Self {
        ConfigSource::Map {
            name: name.into(),
            values,
        }
    }

    /// Read this layer. Keys are returned as found; the store normalizes them.
    pub fn load(&self) -> BTreeMap<String, String> {
        match self {
            ConfigSource::Defaults(values) | ConfigSource::Map { values, .. } => values.clone(),
            ConfigSource::EnvFile(path) => load_file(path, parse_env_file),
            ConfigSource::TomlFile(path) => load_file(path, parse_toml_file),
            ConfigSource::Environment { prefix } => load_environment(prefix.as_deref()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Defaults(_) => write!(f, "defaults"),
            ConfigSource::EnvFile(path) => write!(f, "env file {}", path.display()),
            ConfigSource::TomlFile(path) => write!(f, "toml file {}", path.display()),
            ConfigSource::Environment { prefix: None } => write!(f, "environment"),
            ConfigSource::Environment { prefix: Some(p) } => write!(f, "environment ({p}*)"),
            ConfigSource::Map { name, .. } => write!(f, "{name}"),
        }
    }
}

/// Skip missing files, warn on errors, keep whatever parsed.
fn load_file(
    path: &Path,
    parse: fn(&Path) -> (BTreeMap<String, String>, Option<ConfigError>),
) -> BTreeMap<String, String> {
    if !path.exists() {
        debug!("No config file at {}, skipping", path.display());
        return BTreeMap::new();
    }
    let (values, error) = parse(path);
    if let Some(err) = error {
        warn!(path = %path.display(), error = %err, "Malformed config file");
    }
    values
}

fn parse_env_file(path: &Path) -> (BTreeMap<String, String>, Option<ConfigError>) {
    let mut values = BTreeMap::new();
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            return (
                values,
                Some(ConfigError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }),
            );
        }
    };

    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => {
                return (
                    values,
                    Some(ConfigError::Parse {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }),
                );
            }
        }
    }
    (values, None)
}

fn parse_toml_file(path: &Path) -> (BTreeMap<String, String>, Option<ConfigError>) {
    let mut values = BTreeMap::new();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return (
                values,
                Some(ConfigError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }),
            );
        }
    };

    match toml::from_str::<toml::Table>(&content) {
        Ok(table) => {
            flatten_toml("", &table, &mut values);
            (values, None)
        }
        Err(e) => (
            values,
            Some(ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        ),
    }
}

fn flatten_toml(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.to_ascii_uppercase()
        } else {
            format!("{prefix}_{}", key.to_ascii_uppercase())
        };
        match value {
            toml::Value::Table(inner) => flatten_toml(&full, inner, out),
            other => {
                out.insert(full, toml_scalar(other));
            }
        }
    }
}

fn toml_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(toml_scalar)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn load_environment(prefix: Option<&str>) -> BTreeMap<String, String> {
    let prefix = prefix.map(str::to_ascii_uppercase);
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .filter(|(k, _)| match &prefix {
            Some(p) => k.to_ascii_uppercase().starts_with(p.as_str()),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_files_are_skipped() {
        assert!(ConfigSource::env_file("/nonexistent/.env").load().is_empty());
        assert!(ConfigSource::toml_file("/nonexistent/config.toml").load().is_empty());
    }

    #[test]
    fn env_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            ".env",
            "# comment\nBNB_RPC_URL=https://bsc-dataseed.bnbchain.org\nDEFAULT_NETWORK=\"opbnb\"\n",
        );
        let values = ConfigSource::env_file(&path).load();
        assert_eq!(values["BNB_RPC_URL"], "https://bsc-dataseed.bnbchain.org");
        assert_eq!(values["DEFAULT_NETWORK"], "opbnb");
    }

    #[test]
    fn malformed_env_file_keeps_leading_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, ".env", "GOOD=1\nthis line is not valid\n");
        let values = ConfigSource::env_file(&path).load();
        assert_eq!(values.get("GOOD").map(String::as_str), Some("1"));
    }

    #[test]
    fn toml_file_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.toml",
            "[chainclaw]\ndefault_network = \"bnb\"\nlog_json = true\n\n[bnb]\nrpc_url = \"https://rpc\"\n\nnetworks = [\"bnb\", \"solana\"]\n",
        );
        let values = ConfigSource::toml_file(&path).load();
        assert_eq!(values["CHAINCLAW_DEFAULT_NETWORK"], "bnb");
        assert_eq!(values["CHAINCLAW_LOG_JSON"], "true");
        assert_eq!(values["BNB_RPC_URL"], "https://rpc");
        assert_eq!(values["BNB_NETWORKS"], "bnb,solana");
    }

    #[test]
    fn malformed_toml_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "config.toml", "this = = broken");
        assert!(ConfigSource::toml_file(&path).load().is_empty());
    }

    #[test]
    fn environment_prefix_filters_keys() {
        let values =
            ConfigSource::environment_with_prefix("CHAINCLAW_TEST_UNLIKELY_PREFIX_").load();
        assert!(values.is_empty());
    }

    #[test]
    fn environment_overrides_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            ".env",
            "CHAINCLAW_SRC_TEST_RPC_URL=https://from-file\nCHAINCLAW_SRC_TEST_ONLY_FILE=kept\n",
        );
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("CHAINCLAW_SRC_TEST_RPC_URL", "https://from-env") };

        let store = crate::ConfigStore::new(vec![
            ConfigSource::env_file(&path),
            ConfigSource::environment_with_prefix("CHAINCLAW_SRC_TEST_"),
        ]);
        unsafe { std::env::remove_var("CHAINCLAW_SRC_TEST_RPC_URL") };

        assert_eq!(
            store.get("CHAINCLAW_SRC_TEST_RPC_URL").as_deref(),
            Some("https://from-env")
        );
        assert_eq!(store.get("CHAINCLAW_SRC_TEST_ONLY_FILE").as_deref(), Some("kept"));

        store.reload();
        assert_eq!(
            store.get("CHAINCLAW_SRC_TEST_RPC_URL").as_deref(),
            Some("https://from-file")
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(ConfigSource::environment().to_string(), "environment");
        assert_eq!(ConfigSource::map("cli", BTreeMap::new()).to_string(), "cli");
    }
}
