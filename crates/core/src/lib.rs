//! # ChainClaw Core
//!
//! Domain types, traits, and error definitions for the ChainClaw agent toolkit.
//! This crate defines the model every other crate implements against:
//! networks, providers and their per-plugin registry, tools, plugins, and the
//! execution records emitted while a tool runs.
//!
//! ## Design Philosophy
//!
//! Each seam is a trait here. Implementations live in their own crates:
//! - `chainclaw-plugins` implements providers, tools and plugins
//! - `chainclaw-telemetry` wraps tools with lifecycle telemetry
//! - `chainclaw-agent` orchestrates plugins and resolves user intent

pub mod error;
pub mod event;
pub mod network;
pub mod plugin;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{ExecutionRecord, ExecutionState};
pub use network::{Network, NetworkKind};
pub use plugin::{InitializablePlugin, Plugin, PluginConfig, PluginContext, resolve_network};
pub use provider::{Provider, ProviderRegistry};
pub use tool::{
    NoopProgress, ProgressSink, ProgressUpdate, Tool, ToolCall, ToolDefinition, ToolRegistry,
};
