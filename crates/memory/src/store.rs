//! In-memory vector store with JSON persistence.
//!
//! Documents and their embeddings live in a `Vec` behind a `RwLock`. Search is
//! a linear scan, which is plenty for a personal document folder. The whole
//! store serializes to one JSON file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use llamantin_core::document::{Document, DocumentStore, Embedder};
use llamantin_core::error::MemoryError;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::vector::l2_relevance;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    document: Document,
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    entries: Vec<StoredDocument>,
}

pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    entries: Arc<RwLock<Vec<StoredDocument>>>,
}

impl VectorStore {
    /// Create an empty store.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Load a store previously written by [`save`](Self::save).
    ///
    /// The embedder must be the one the store was built with.
    pub async fn load(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to read store at {}: {e}", path.display()))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            MemoryError::Storage(format!("Corrupted store at {}: {e}", path.display()))
        })?;

        if let (Some(saved), Some(current)) = (snapshot.dimensions, embedder.dimensions()) {
            if saved != current {
                return Err(MemoryError::Storage(format!(
                    "store at {} was built with {saved}-dimensional embeddings, embedder produces {current}",
                    path.display()
                )));
            }
        }

        info!(path = %path.display(), count = snapshot.entries.len(), "Vector store loaded");
        Ok(Self {
            embedder,
            entries: Arc::new(RwLock::new(snapshot.entries)),
        })
    }

    /// Write the whole store to `path` as JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        let entries = self.entries.read().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create store directory: {e}"))
            })?;
        }

        let snapshot = Snapshot {
            dimensions: self.embedder.dimensions(),
            entries: entries.clone(),
        };
        let content = serde_json::to_string(&snapshot)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize store: {e}")))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write store: {e}")))?;

        debug!(path = %path.display(), count = entries.len(), "Vector store saved");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for VectorStore {
    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, MemoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, &StoredDocument)> = entries
            .iter()
            .map(|e| (l2_relevance(&e.embedding, &query_embedding), e))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, e)| (e.document.clone(), score))
            .collect())
    }

    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize, MemoryError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(MemoryError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let count = documents.len();
        let mut entries = self.entries.write().await;
        entries.extend(
            documents
                .into_iter()
                .zip(embeddings)
                .map(|(document, embedding)| StoredDocument { document, embedding }),
        );
        Ok(count)
    }

    async fn len(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}
