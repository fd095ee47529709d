//! Provider trait — the abstraction over language-model backends.
//!
//! A Provider receives the full conversation plus the capabilities on offer
//! and answers with exactly one assistant turn: plain text, or a request to
//! run a capability.
//!
//! Implementations: native Ollama, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgentError, ProviderError};
use crate::message::{Role, ToolCall, Turn};

/// Everything a backend needs for one consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "mistral-nemo", "gpt-4o")
    pub model: String,

    /// The complete conversation so far
    pub turns: Vec<Turn>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Capabilities the model may request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.3
}

/// A capability descriptor sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// One decoded assistant turn, before it is appended to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReply {
    pub role: Role,

    #[serde(default)]
    pub content: String,

    /// At most one capability request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ModelReply {
    /// A plain-text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: None,
        }
    }

    /// A reply requesting one capability, with optional narration.
    pub fn tool_call(content: impl Into<String>, call: ToolCall) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: Some(call),
        }
    }

    /// Build a reply from whatever calls the backend proposed.
    ///
    /// Only the first call is honored; the rest are dropped.
    pub fn from_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let dropped = calls.len().saturating_sub(1);
        if dropped > 0 {
            debug!(dropped, "Model proposed several tool calls, keeping the first");
        }
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: calls.into_iter().next(),
        }
    }

    /// Convert into the turn that gets appended to the conversation.
    ///
    /// A reply with neither text nor a request cannot be decoded into a
    /// meaningful turn and is reported as malformed.
    pub fn into_turn(self) -> Result<Turn, AgentError> {
        if self.role != Role::Assistant {
            return Err(AgentError::MalformedReply(format!(
                "expected an assistant reply, got role '{}'",
                self.role.as_str()
            )));
        }
        match self.tool_call {
            Some(call) => Ok(Turn::assistant_with_tool_call(self.content, call)),
            None if self.content.is_empty() => Err(AgentError::MalformedReply(
                "reply has neither content nor a tool call".into(),
            )),
            None => Ok(Turn::assistant(self.content)),
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The decoded reply
    pub reply: ModelReply,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "all-minilm").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The core Provider trait.
///
/// The orchestration loop calls `complete()` without knowing which backend
/// answers. Retries and timeouts belong to implementations, never to the loop.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send the conversation and get one assistant reply.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            format!("Provider '{}' does not support embeddings", self.name()),
        ))
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
