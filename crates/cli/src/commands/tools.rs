//! `chainclaw tools`: List registered tools.

use chainclaw_agent::Agent;

pub fn run(agent: &Agent) {
    println!("🦀 ChainClaw Tools");
    println!("==================");
    for tool in agent.tools().tools() {
        let plugin = agent.owner_of(tool.name()).unwrap_or("-");
        println!("  {:<18} [{plugin}] {}", tool.name(), tool.description());
    }
    println!("\n  {} tools from {} plugins", agent.tools().len(), agent.plugins().len());
}
