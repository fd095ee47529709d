//! Error types for the Llamantin domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`AgentError`] is what a run
//! of the orchestration loop surfaces to its caller.

use thiserror::Error;

/// The top-level error type for all Llamantin operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Agent run errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

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

/// Failures that end a run of the orchestration loop.
///
/// Capability failures are absent: they are folded into the
/// conversation as a `tool` turn and never reach the caller.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(ProviderError),

    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Step budget exceeded: no final answer after {steps} model consultations")]
    StepBudgetExceeded { steps: usize },

    #[error("Conversation protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Document store error: {0}")]
    Store(String),
}

impl AgentError {
    /// Whether this error is a fault of the model backend rather than of the
    /// registry or the caller.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_) | Self::MalformedReply(_))
    }
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MalformedReply(reason) => Self::MalformedReply(reason),
            other => Self::ModelUnavailable(other),
        }
    }
}

impl From<MemoryError> for AgentError {
    fn from(err: MemoryError) -> Self {
        Self::Store(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Reply could not be decoded: {0}")]
    MalformedReply(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Classify a `reqwest` transport failure.
    ///
    /// Kept as a plain string mapper so core stays free of HTTP dependencies.
    pub fn from_transport(is_timeout: bool, message: impl Into<String>) -> Self {
        if is_timeout {
            Self::Timeout(message.into())
        } else {
            Self::Network(message.into())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Document store not initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn malformed_provider_reply_maps_to_malformed() {
        let err: AgentError = ProviderError::MalformedReply("arguments not JSON".into()).into();
        assert!(matches!(err, AgentError::MalformedReply(ref m) if m == "arguments not JSON"));
        assert!(err.is_model_failure());
    }

    #[test]
    fn transport_failures_map_to_unavailable() {
        for err in [
            ProviderError::Network("connection refused".into()),
            ProviderError::Timeout("120s".into()),
            ProviderError::RateLimited { retry_after_secs: 5 },
            ProviderError::ApiError { status_code: 500, message: "boom".into() },
        ] {
            let mapped: AgentError = err.into();
            assert!(matches!(mapped, AgentError::ModelUnavailable(_)));
        }
    }

    #[test]
    fn unknown_capability_is_not_a_model_failure() {
        let err = AgentError::UnknownCapability("x".into());
        assert!(!err.is_model_failure());
        assert!(err.to_string().contains('x'));
    }

    #[test]
    fn unsupported_provider_message() {
        let err = ProviderError::UnsupportedProvider("invalid".into());
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }
}
