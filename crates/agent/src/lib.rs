//! The orchestration loop and the agents built on it.
//!
//! A run alternates between two steps over an append-only conversation:
//!
//! 1. **Consult** the model with the whole conversation
//! 2. **Invoke** the capability it asked for, appending the result as a tool turn
//!
//! The run ends when the model answers without requesting a capability.
//! Every consultation yields a snapshot of the conversation so callers can
//! stream progress.

pub mod factory;
pub mod loop_runner;
pub mod patterns;

pub use factory::AgentFactory;
pub use loop_runner::{AgentLoop, RunStream, Step};
pub use patterns::{AgentKind, DocSearchAgent, SearchAgent, WebSearchAgent};
