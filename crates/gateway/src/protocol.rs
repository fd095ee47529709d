//! Frames exchanged over `/ws/{task_id}`.

use llamantin_agent::AgentKind;
use serde::{Deserialize, Serialize};

/// Shown while the document store is still being built.
pub const WAITING_MESSAGE: &str = "Database is initializing, please wait...";

/// The single frame a client sends after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub agent_type: AgentKind,
    pub query: String,
}

/// The server's reply, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskUpdate {
    Waiting { message: String },
    Completed { result: String },
    Failed { error: String },
    /// The request frame itself was unusable.
    Error { message: String },
}

impl TaskUpdate {
    pub fn waiting() -> Self {
        Self::Waiting {
            message: WAITING_MESSAGE.into(),
        }
    }

    pub fn completed(result: impl Into<String>) -> Self {
        Self::Completed {
            result: result.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
