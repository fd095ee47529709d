//! Web search: let the model query a search engine and write a report.
//!
//! The agent's registry holds exactly one tool, `search_query`, backed by
//! either Google (Serper) or DuckDuckGo.

use async_trait::async_trait;
use llamantin_core::error::AgentError;
use llamantin_core::message::{Conversation, Turn};
use tracing::info;

use super::{AgentKind, SearchAgent, require_query};
use crate::loop_runner::AgentLoop;

pub struct WebSearchAgent {
    kind: AgentKind,
    agent: AgentLoop,
}

impl WebSearchAgent {
    /// Wrap a loop whose registry carries the search tool.
    pub fn new(kind: AgentKind, agent: AgentLoop) -> Self {
        Self { kind, agent }
    }

    /// The user turn the run starts from.
    pub fn seed_message(query: &str) -> String {
        format!("Search for {query} and create an engaging report with the most relevant findings.")
    }
}

#[async_trait]
impl SearchAgent for WebSearchAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn search(&self, query: &str) -> Result<String, AgentError> {
        let query = require_query(query)?;
        info!(query, agent = self.kind.as_str(), "Running web search");

        let conversation = Conversation::seed([Turn::user(Self::seed_message(query))])?;
        self.agent.process(conversation).await
    }
}
