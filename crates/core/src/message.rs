//! Turn and Conversation domain types.
//!
//! A [`Conversation`] is the only state the orchestration loop carries: an
//! append-only sequence of [`Turn`]s. Every model consultation sees all of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;

/// Unique identifier for a conversation (one run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The language model
    Assistant,
    /// System instructions
    System,
    /// Capability output
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

/// A model-emitted request to run one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID (the backend's, or generated when the backend has none)
    pub id: String,

    /// Name of the capability to run
    pub name: String,

    /// Structured arguments
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content (may be empty on an assistant turn that requests a tool)
    pub content: String,

    /// Capability request carried by an assistant turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    /// On tool turns: which capability produced this content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_call: None,
            tool_name: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// An assistant turn that asks for a capability, optionally with narration.
    pub fn assistant_with_tool_call(content: impl Into<String>, call: ToolCall) -> Self {
        let mut turn = Self::new(Role::Assistant, content.into());
        turn.tool_call = Some(call);
        turn
    }

    /// The output of a capability, attributed to it by name.
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut turn = Self::new(Role::Tool, content.into());
        turn.tool_name = Some(tool_name.into());
        turn
    }

    /// Whether this turn asks for a capability to be run.
    pub fn requests_tool(&self) -> bool {
        self.tool_call.is_some()
    }
}

/// An ordered, append-only sequence of turns owned by one run.
///
/// Turns can only be added through [`Conversation::push`], which enforces:
/// - a `tool` turn directly follows an `assistant` turn carrying a tool call;
/// - an `assistant` turn is never both empty and request-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    turns: Vec<Turn>,

    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Build a conversation from caller-supplied turns.
    pub fn seed(turns: impl IntoIterator<Item = Turn>) -> Result<Self, AgentError> {
        let mut conversation = Self::new();
        for turn in turns {
            conversation.push(turn)?;
        }
        Ok(conversation)
    }

    /// Append a turn, rejecting anything that breaks the turn protocol.
    pub fn push(&mut self, turn: Turn) -> Result<(), AgentError> {
        match turn.role {
            Role::Tool => {
                let preceded_by_request = self
                    .turns
                    .last()
                    .is_some_and(|prev| prev.role == Role::Assistant && prev.requests_tool());
                if !preceded_by_request {
                    return Err(AgentError::ProtocolViolation(
                        "tool turn must follow an assistant turn that requested a tool".into(),
                    ));
                }
            }
            Role::Assistant if turn.content.is_empty() && turn.tool_call.is_none() => {
                return Err(AgentError::ProtocolViolation(
                    "assistant turn has neither content nor a tool call".into(),
                ));
            }
            _ => {}
        }

        if turn.tool_call.is_some() && turn.role != Role::Assistant {
            return Err(AgentError::ProtocolViolation(format!(
                "only assistant turns may request tools, got a {} turn",
                turn.role.as_str()
            )));
        }

        self.turns.push(turn);
        Ok(())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Content of the last turn, which is the answer once a run is done.
    pub fn final_answer(&self) -> Option<&str> {
        self.turns.last().map(|t| t.content.as_str())
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
