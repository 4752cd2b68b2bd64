//! ChainClaw CLI: the main entry point.
//!
//! Commands:
//! - `tools`: List registered tools
//! - `networks`: Show networks and providers per plugin
//! - `run`: Invoke a tool with JSON input
//! - `ask`: Resolve free text to a tool and invoke it
//! - `config`: Show the merged configuration or one key

use std::path::PathBuf;

use anyhow::Context;
use chainclaw_config::{AgentSettings, ConfigSource, ConfigStore, global, settings};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chainclaw",
    about = "ChainClaw — pluggable on-chain agent toolkit",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print tool lifecycle events as JSON lines on stderr
    #[arg(short, long, global = true)]
    watch: bool,

    /// Extra env-style config file, applied after ./.env (repeatable)
    #[arg(long = "env-file", value_name = "PATH", global = true)]
    env_files: Vec<PathBuf>,

    /// Override a configuration key (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    overrides: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tools
    Tools,

    /// Show supported networks and providers per plugin
    Networks,

    /// Invoke a tool
    Run {
        /// Tool name, e.g. get_balance
        tool: String,

        /// Tool input as a JSON object
        #[arg(short, long, default_value = "{}")]
        input: String,
    },

    /// Resolve a request to a tool and invoke it
    Ask {
        /// The request, e.g. "balance of 0xabc on opbnb"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the merged configuration (secrets redacted)
    Show,

    /// Print one key
    Get { key: String },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn init_tracing(verbose: bool, settings: &AgentSettings) {
    let level = if verbose { "debug" } else { settings.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if settings.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut sources = settings::default_sources(&cli.env_files);
    if !cli.overrides.is_empty() {
        sources.push(ConfigSource::map("cli", cli.overrides.iter().cloned().collect()));
    }
    let store = global::init(ConfigStore::new(sources));
    let settings = AgentSettings::from_store(&store);

    init_tracing(cli.verbose, &settings);

    let watch = cli.watch;
    let agent = || commands::build_agent(&settings, watch).context("Failed to set up the agent");

    match cli.command {
        Commands::Tools => commands::tools::run(&agent()?),
        Commands::Networks => commands::networks::run(&agent()?),
        Commands::Run { tool, input } => commands::invoke::run(&agent()?, &tool, &input).await?,
        Commands::Ask { text } => commands::invoke::ask(&agent()?, &text.join(" ")).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&store),
            ConfigAction::Get { key } => commands::config_cmd::get(&store, &key)?,
        },
    }

    Ok(())
}
