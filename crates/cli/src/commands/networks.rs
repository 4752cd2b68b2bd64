//! `chainclaw networks`: Supported networks and providers per plugin.

use chainclaw_agent::Agent;

pub fn run(agent: &Agent) {
    for plugin in agent.plugins() {
        let default = plugin
            .default_network()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".into());
        println!("🔌 {} — {} (default: {default})", plugin.name(), plugin.description());

        let networks = plugin.supported_networks();
        if networks.is_empty() {
            println!("  ⚠️  No provider serves any configured network");
        }
        for network in networks {
            let chain = network
                .chain_id()
                .map(|id| format!(", chain {id}"))
                .unwrap_or_default();
            let providers: Vec<String> = plugin
                .providers_for_network(&network)
                .iter()
                .map(|p| p.name().to_string())
                .collect();
            println!(
                "  {:<14} [{}{chain}]  providers: {}",
                network.as_str(),
                network.kind(),
                providers.join(", ")
            );
        }
        println!();
    }
}
