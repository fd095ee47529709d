//! Document store traits — the retrieval side of document search.
//!
//! The doc-search caller only ever asks a store for the passages most similar
//! to a query, together with a relevance score (1 for an exact match, lower
//! the further away). How documents get in (crawling, embedding, persisting)
//! is the store's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A stored passage plus free-form metadata (e.g. `path`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Turns text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text; the result has one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError>;

    /// Vector width, when known up front.
    fn dimensions(&self) -> Option<usize> {
        None
    }

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| MemoryError::EmbeddingFailed("embedder returned no vector".into()))
    }
}

/// A searchable collection of documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return up to `k` documents ranked by relevance, highest first.
    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, MemoryError>;

    /// Add documents to the store.
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, MemoryError>;

    /// Number of stored documents.
    async fn len(&self) -> Result<usize, MemoryError>;
}
