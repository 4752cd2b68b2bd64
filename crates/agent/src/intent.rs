//! Intent resolution: turning free text into a tool call.
//!
//! The agent does not care how a call is chosen. [`KeywordResolver`] is the
//! built-in, deterministic resolver; a language-model resolver plugs in through
//! the same [`IntentResolver`] trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chainclaw_core::{Network, ToolCall, ToolDefinition};
use tracing::debug;

/// Picks a tool and its arguments for a piece of user text.
#[async_trait]
pub trait IntentResolver: Send + Sync {
    /// `None` when no tool fits.
    async fn resolve(&self, text: &str, tools: &[ToolDefinition]) -> Option<ToolCall>;
}

/// Matches tools by name and keywords, then lifts arguments out of the text:
///
/// - `key=value` pairs, for keys the tool's schema declares
/// - `0x…` hex strings as `address`
/// - well-known network names as `network`
#[derive(Debug, Clone)]
pub struct KeywordResolver {
    keywords: BTreeMap<String, Vec<String>>,
}

impl KeywordResolver {
    pub fn new() -> Self {
        let mut resolver = Self {
            keywords: BTreeMap::new(),
        };
        resolver.add_keywords("get_balance", ["balance", "balances", "holdings", "how much"]);
        resolver.add_keywords("list_networks", ["networks", "chains", "supported"]);
        resolver.add_keywords("get_network_info", ["network info", "chain id", "rpc", "endpoint"]);
        resolver
    }

    /// Extra phrases that select `tool`. Phrases are matched case-insensitively.
    pub fn with_keywords<I, S>(mut self, tool: &str, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_keywords(tool, phrases);
        self
    }

    fn add_keywords<I, S>(&mut self, tool: &str, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords
            .entry(tool.to_string())
            .or_default()
            .extend(phrases.into_iter().map(|p| p.as_ref().to_ascii_lowercase()));
    }

    /// Score every tool; the highest wins, ties go to the earlier tool.
    fn select<'a>(&self, text: &str, tools: &'a [ToolDefinition]) -> Option<&'a ToolDefinition> {
        let lowered = text.to_ascii_lowercase();
        let words = tokenize(&lowered);

        let mut best: Option<(usize, &ToolDefinition)> = None;
        for tool in tools {
            let mut score = 0;
            if words.iter().any(|w| *w == tool.name) {
                score += 10;
            }
            if let Some(phrases) = self.keywords.get(&tool.name) {
                score += phrases.iter().filter(|p| lowered.contains(p.as_str())).count();
            }
            if score > 0 && best.is_none_or(|(top, _)| score > top) {
                best = Some((score, tool));
            }
        }
        best.map(|(_, tool)| tool)
    }
}

impl Default for KeywordResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentResolver for KeywordResolver {
    async fn resolve(&self, text: &str, tools: &[ToolDefinition]) -> Option<ToolCall> {
        let tool = self.select(text, tools)?;
        let arguments = extract_arguments(text, &tool.parameters);
        debug!(tool = %tool.name, arguments = %arguments, "Resolved intent");
        Some(ToolCall {
            name: tool.name.clone(),
            arguments,
        })
    }
}

/// Split on anything that cannot be part of a name, address or `key=value`.
fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || "=-_.".contains(c)))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_hex_address(token: &str) -> bool {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn extract_arguments(text: &str, schema: &serde_json::Value) -> serde_json::Value {
    let declared = schema.get("properties").and_then(serde_json::Value::as_object);
    let accepts = |key: &str| declared.is_some_and(|props| props.contains_key(key));
    let known: Vec<Network> = Network::well_known();

    let mut args = serde_json::Map::new();
    for token in tokenize(text) {
        if let Some((key, value)) = token.split_once('=') {
            let key = key.to_ascii_lowercase();
            if !value.is_empty() && accepts(&key) {
                args.insert(key, serde_json::Value::String(value.to_string()));
            }
        } else if is_hex_address(token) {
            if accepts("address") && !args.contains_key("address") {
                args.insert("address".into(), token.into());
            }
        } else if accepts("network") && !args.contains_key("network") {
            let candidate = Network::new(token);
            if known.contains(&candidate) {
                args.insert("network".into(), candidate.as_str().into());
            }
        }
    }
    serde_json::Value::Object(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tools() -> Vec<ToolDefinition> {
        let def = |name: &str, props: serde_json::Value| ToolDefinition {
            name: name.into(),
            description: String::new(),
            parameters: json!({"type": "object", "properties": props}),
        };
        vec![
            def("list_networks", json!({})),
            def("get_network_info", json!({"network": {"type": "string"}})),
            def(
                "get_balance",
                json!({
                    "address": {"type": "string"},
                    "network": {"type": "string"},
                    "token": {"type": "string"}
                }),
            ),
        ]
    }

    async fn resolve(text: &str) -> Option<ToolCall> {
        KeywordResolver::new().resolve(text, &tools()).await
    }

    #[tokio::test]
    async fn balance_question_extracts_address_and_network() {
        let call = resolve("What is the balance of 0xAbC123 on opBNB?").await.unwrap();
        assert_eq!(call.name, "get_balance");
        assert_eq!(call.arguments, json!({"address": "0xAbC123", "network": "opbnb"}));
    }

    #[tokio::test]
    async fn key_value_pairs_are_kept_when_declared() {
        let call = resolve("balance token=USDT network=bnb-testnet color=red")
            .await
            .unwrap();
        assert_eq!(call.arguments, json!({"token": "USDT", "network": "bnb-testnet"}));
    }

    #[tokio::test]
    async fn exact_tool_name_wins() {
        let call = resolve("run get_network_info for the rpc of solana").await.unwrap();
        assert_eq!(call.name, "get_network_info");
        assert_eq!(call.arguments, json!({"network": "solana"}));
    }

    #[tokio::test]
    async fn networks_question_has_no_arguments() {
        let call = resolve("which chains are supported?").await.unwrap();
        assert_eq!(call.name, "list_networks");
        assert_eq!(call.arguments, json!({}));
    }

    #[tokio::test]
    async fn unrelated_text_resolves_to_nothing() {
        assert!(resolve("tell me a joke").await.is_none());
    }

    #[tokio::test]
    async fn custom_keywords_extend_matching() {
        let resolver = KeywordResolver::new().with_keywords("get_balance", ["wallet"]);
        let call = resolver.resolve("check my wallet", &tools()).await.unwrap();
        assert_eq!(call.name, "get_balance");
    }

    #[test]
    fn hex_addresses() {
        assert!(is_hex_address("0x00fF"));
        assert!(!is_hex_address("0x"));
        assert!(!is_hex_address("0xzz"));
        assert!(!is_hex_address("bnb"));
    }
}
