//! `chainclaw run` / `chainclaw ask`: Invoke a tool.

use anyhow::Context;
use async_trait::async_trait;
use chainclaw_agent::Agent;
use chainclaw_core::{ProgressSink, ProgressUpdate};

/// Prints progress lines to stderr so stdout carries only the tool output.
struct ConsoleProgress;

#[async_trait]
impl ProgressSink for ConsoleProgress {
    async fn emit(&self, update: ProgressUpdate) {
        eprintln!("  ⏳ {}", update.display_message());
    }
}

fn print_output(output: &str) {
    match serde_json::from_str::<serde_json::Value>(output) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{output}"),
        },
        Err(_) => println!("{output}"),
    }
}

pub async fn run(agent: &Agent, tool: &str, input: &str) -> anyhow::Result<()> {
    let input: serde_json::Value =
        serde_json::from_str(input).context("--input must be a JSON object")?;
    let output = agent.invoke_with_progress(tool, input, &ConsoleProgress).await?;
    print_output(&output);
    Ok(())
}

pub async fn ask(agent: &Agent, text: &str) -> anyhow::Result<()> {
    let call = agent.resolve(text).await?;
    eprintln!("🔧 {} {}", call.name, call.arguments);
    let output = agent
        .invoke_with_progress(&call.name, call.arguments, &ConsoleProgress)
        .await?;
    print_output(&output);
    Ok(())
}
