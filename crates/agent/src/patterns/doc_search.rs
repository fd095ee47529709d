//! Document search: answer a question from passages in the document store.
//!
//! Retrieval happens once, before the loop runs. The passages that clear the
//! relevance cutoff are pasted into the seed turn, and the model answers
//! without any tools.

use std::sync::Arc;

use async_trait::async_trait;
use llamantin_core::document::DocumentStore;
use llamantin_core::error::AgentError;
use llamantin_core::message::{Conversation, Turn};
use tracing::{debug, info};

use super::{AgentKind, SearchAgent, require_query};
use crate::loop_runner::AgentLoop;

/// Default minimum relevance a passage needs.
pub const DEFAULT_CUTOFF: f32 = 0.25;

/// Default number of passages fetched before filtering.
pub const DEFAULT_TOP_K: usize = 4;

pub struct DocSearchAgent {
    agent: AgentLoop,
    store: Arc<dyn DocumentStore>,
    cutoff: f32,
    top_k: usize,
}

impl DocSearchAgent {
    pub fn new(agent: AgentLoop, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            agent,
            store,
            cutoff: DEFAULT_CUTOFF,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// The user turn the run starts from.
    pub fn seed_message(query: &str, context: &str) -> String {
        format!("Answer the {query} using the following context: '{context}'.")
    }

    /// Fetch passages for `query` and join those scoring at least the cutoff.
    pub async fn build_context(&self, query: &str) -> Result<String, AgentError> {
        let hits = self.store.similarity_search_with_scores(query, self.top_k).await?;
        let total = hits.len();

        let passages: Vec<String> = hits
            .into_iter()
            .filter(|(_, score)| *score >= self.cutoff)
            .map(|(doc, _)| doc.page_content)
            .collect();

        debug!(retrieved = total, kept = passages.len(), cutoff = self.cutoff, "Filtered passages");
        Ok(passages.join("\n\n"))
    }
}

#[async_trait]
impl SearchAgent for DocSearchAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::DocSearch
    }

    async fn search(&self, query: &str) -> Result<String, AgentError> {
        let query = require_query(query)?;
        let context = self.build_context(query).await?;

        info!(query, context_chars = context.len(), "Running document search");
        let conversation = Conversation::seed([Turn::user(Self::seed_message(query, &context))])?;
        self.agent.process(conversation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::*;
    use llamantin_core::document::Document;
    use llamantin_core::error::MemoryError;
    use llamantin_core::event::EventBus;
    use llamantin_core::tool::ToolRegistry;

    /// Returns fixed hits regardless of the query.
    struct FixedStore(Vec<(Document, f32)>);

    #[async_trait]
    impl DocumentStore for FixedStore {
        async fn similarity_search_with_scores(
            &self,
            _query: &str,
            k: usize,
        ) -> Result<Vec<(Document, f32)>, MemoryError> {
            Ok(self.0.iter().take(k).cloned().collect())
        }

        async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, MemoryError> {
            Ok(documents.len())
        }

        async fn len(&self) -> Result<usize, MemoryError> {
            Ok(self.0.len())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn similarity_search_with_scores(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<(Document, f32)>, MemoryError> {
            Err(MemoryError::NotInitialized)
        }

        async fn add_documents(&self, _documents: Vec<Document>) -> Result<usize, MemoryError> {
            Err(MemoryError::NotInitialized)
        }

        async fn len(&self) -> Result<usize, MemoryError> {
            Ok(0)
        }
    }

    fn hits() -> Vec<(Document, f32)> {
        vec![
            (Document::new("Trustees are evaluated every year."), 0.81),
            (Document::new("The board sets the evaluation criteria."), 0.25),
            (Document::new("Lunch is served at noon."), 0.12),
        ]
    }

    fn agent_with(provider: Arc<SequentialMockProvider>, store: Arc<dyn DocumentStore>) -> DocSearchAgent {
        let agent = AgentLoop::new(
            provider,
            "mock-model",
            0.0,
            Arc::new(ToolRegistry::new()),
            Arc::new(EventBus::default()),
        );
        DocSearchAgent::new(agent, store)
    }

    #[test]
    fn seed_template_is_literal() {
        assert_eq!(
            DocSearchAgent::seed_message("how are trustees evaluated", "ctx"),
            "Answer the how are trustees evaluated using the following context: 'ctx'."
        );
    }

    #[tokio::test]
    async fn context_keeps_passages_at_or_above_cutoff() {
        let provider = Arc::new(SequentialMockProvider::single_text("unused"));
        let agent = agent_with(provider, Arc::new(FixedStore(hits())));

        let context = agent.build_context("trustees").await.unwrap();
        assert_eq!(
            context,
            "Trustees are evaluated every year.\n\nThe board sets the evaluation criteria."
        );

        let strict = agent.with_cutoff(0.9);
        assert_eq!(strict.build_context("trustees").await.unwrap(), "");
    }

    #[tokio::test]
    async fn search_seeds_conversation_and_returns_answer() {
        let provider = Arc::new(SequentialMockProvider::single_text("Yearly, by the board."));
        let agent = agent_with(provider.clone(), Arc::new(FixedStore(hits())));

        let answer = agent.search("how are trustees evaluated").await.unwrap();
        assert_eq!(answer, "Yearly, by the board.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert_eq!(
            requests[0].turns[0].content,
            "Answer the how are trustees evaluated using the following context: \
             'Trustees are evaluated every year.\n\nThe board sets the evaluation criteria.'."
        );
    }

    #[tokio::test]
    async fn top_k_bounds_retrieval() {
        let provider = Arc::new(SequentialMockProvider::single_text("unused"));
        let agent = agent_with(provider, Arc::new(FixedStore(hits()))).with_top_k(1);
        assert_eq!(
            agent.build_context("trustees").await.unwrap(),
            "Trustees are evaluated every year."
        );
    }

    #[tokio::test]
    async fn empty_query_rejected_before_model_call() {
        let provider = Arc::new(SequentialMockProvider::single_text("unused"));
        let agent = agent_with(provider.clone(), Arc::new(FixedStore(hits())));

        let err = agent.search("   ").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidQuery(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let provider = Arc::new(SequentialMockProvider::single_text("unused"));
        let agent = agent_with(provider.clone(), Arc::new(BrokenStore));

        let err = agent.search("trustees").await.unwrap_err();
        assert!(matches!(err, AgentError::Store(_)));
        assert_eq!(provider.call_count(), 0);
    }
}
