//! Document store for Llamantin's document search.
//!
//! A [`VectorStore`] holds embedded passages; a [`Collector`] fills it from a
//! directory and persists it.

pub mod collector;
pub mod embedder;
pub mod store;
pub mod vector;

pub use collector::Collector;
pub use embedder::{HashingEmbedder, ProviderEmbedder};
pub use store::VectorStore;
pub use vector::{cosine_similarity, l2_relevance};
