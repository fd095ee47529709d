//! Collector: fills a [`VectorStore`] from a directory of documents.
//!
//! On open, a previously saved store is loaded and the collector counts as
//! initialized. Otherwise [`Collector::initialize`] crawls the directory,
//! indexes every readable text file, and saves the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use llamantin_core::document::{Document, DocumentStore, Embedder};
use llamantin_core::error::MemoryError;
use tracing::{debug, info, warn};

use crate::store::VectorStore;

pub struct Collector {
    directory: PathBuf,
    db_path: PathBuf,
    store: Arc<VectorStore>,
    initialized: AtomicBool,
}

impl Collector {
    /// Open the collector, loading the saved store at `db_path` if it exists.
    pub async fn open(
        directory: impl Into<PathBuf>,
        db_path: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, MemoryError> {
        let directory = directory.into();
        let db_path = db_path.into();

        let (store, initialized) = if tokio::fs::try_exists(&db_path).await.unwrap_or(false) {
            (VectorStore::load(&db_path, embedder).await?, true)
        } else {
            (VectorStore::new(embedder), false)
        };

        Ok(Self {
            directory,
            db_path,
            store: Arc::new(store),
            initialized: AtomicBool::new(initialized),
        })
    }

    /// Whether the store is ready to serve searches.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The store searches go to.
    pub fn store(&self) -> Arc<VectorStore> {
        Arc::clone(&self.store)
    }

    /// Crawl and persist, unless a saved store was already loaded.
    ///
    /// Returns the number of documents indexed by this call.
    pub async fn initialize(&self) -> Result<usize, MemoryError> {
        if self.is_initialized() {
            return Ok(0);
        }

        info!(directory = %self.directory.display(), "Initializing document store");
        let indexed = self.crawl_directory(&self.directory).await?;
        self.store.save(&self.db_path).await?;
        self.initialized.store(true, Ordering::Release);
        info!(indexed, path = %self.db_path.display(), "Database initialized");
        Ok(indexed)
    }

    /// Index every file under `directory`, recursively.
    pub async fn crawl_directory(&self, directory: &Path) -> Result<usize, MemoryError> {
        let mut pending = vec![directory.to_path_buf()];
        let mut indexed = 0;

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to read directory {}: {e}", dir.display()))
            })?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| MemoryError::Storage(e.to_string()))?
            {
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && self.process_file(&path).await? {
                    indexed += 1;
                }
            }
        }

        Ok(indexed)
    }

    /// Index a single file. Returns `false` when the file was skipped.
    pub async fn process_file(&self, path: &Path) -> Result<bool, MemoryError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unsupported format");
                return Ok(false);
            }
        };

        let content = content.trim();
        if content.is_empty() {
            warn!(path = %path.display(), "Unsupported format: no content extracted");
            return Ok(false);
        }

        let document = Document::new(content).with_metadata("path", path.display().to_string());
        self.store.add_documents(vec![document]).await?;
        debug!(path = %path.display(), "Indexed file");
        Ok(true)
    }
}
