//! Error types for the ChainClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for ChainClaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Lookup by a name that was never registered (or was filtered out).
    #[error("Provider not found: {0}")]
    NotFound(String),

    /// A network has zero effective providers at the time a tool needs one.
    #[error("No provider available for network '{network}'")]
    NoProviderAvailable { network: String },

    /// The provider was reached but the operation failed.
    #[error("Provider '{provider}' request failed: {reason}")]
    Request { provider: String, reason: String },

    #[error("Provider '{provider}' does not support network '{network}'")]
    Unsupported { provider: String, network: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool cancelled: {tool_name}")]
    Cancelled { tool_name: String },
}

impl ToolError {
    /// Short machine-readable kind, carried in telemetry next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "not_found",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::Provider(ProviderError::NotFound(_)) => "provider_not_found",
            ToolError::Provider(ProviderError::NoProviderAvailable { .. }) => {
                "no_provider_available"
            }
            ToolError::Provider(_) => "provider",
            ToolError::ExecutionFailed { .. } => "execution_failed",
            ToolError::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::NoProviderAvailable {
            network: "solana".into(),
        });
        assert!(err.to_string().contains("solana"));
        assert!(err.to_string().contains("No provider available"));
    }

    #[test]
    fn tool_error_is_transparent_over_provider_error() {
        let err: ToolError = ProviderError::NotFound("bscscan".into()).into();
        assert_eq!(err.to_string(), "Provider not found: bscscan");
        assert_eq!(err.kind(), "provider_not_found");
    }

    #[test]
    fn cancelled_kind() {
        let err = ToolError::Cancelled {
            tool_name: "swap".into(),
        };
        assert_eq!(err.kind(), "cancelled");
        assert!(err.to_string().contains("swap"));
    }
}
