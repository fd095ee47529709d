//! Agent patterns: the callers that seed a conversation and drain a run.
//!
//! 1. **Document search** retrieves passages first and asks the model to
//!    answer from them, with no tools.
//! 2. **Web search** gives the model one search tool and asks for a report.

pub mod doc_search;
pub mod web_search;

use async_trait::async_trait;
use llamantin_core::error::AgentError;
use serde::{Deserialize, Serialize};

pub use doc_search::DocSearchAgent;
pub use web_search::WebSearchAgent;

/// Which kind of agent a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    GoogleSearch,
    DuckSearch,
    DocSearch,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleSearch => "google_search",
            Self::DuckSearch => "duck_search",
            Self::DocSearch => "doc_search",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_search" => Ok(Self::GoogleSearch),
            "duck_search" => Ok(Self::DuckSearch),
            "doc_search" => Ok(Self::DocSearch),
            other => Err(format!("Unknown agent type: {other}")),
        }
    }
}

/// A caller that turns a free-text query into a final answer.
#[async_trait]
pub trait SearchAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn search(&self, query: &str) -> Result<String, AgentError>;
}

/// Trim `query`, rejecting it when nothing is left.
pub(crate) fn require_query(query: &str) -> Result<&str, AgentError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidQuery("query must not be empty".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
pub(crate) mod test_helpers;
