//! # Llamantin Core
//!
//! Domain types, traits, and error definitions for the Llamantin agent.
//! No HTTP, storage or model code lives here: this crate defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration loop is a trait here: the model
//! backend ([`Provider`]), the capabilities ([`Tool`]), and the document store
//! ([`DocumentStore`]). Implementations live in their respective crates, and
//! tests drive the loop with scripted stand-ins.

pub mod document;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use document::{Document, DocumentStore, Embedder};
pub use error::{AgentError, Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Role, ToolCall, Turn};
pub use provider::{ModelReply, Provider, ProviderRequest, ProviderResponse};
pub use tool::{Tool, ToolRegistry};
