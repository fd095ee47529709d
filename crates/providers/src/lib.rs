//! LLM Provider implementations for Llamantin.
//!
//! All providers implement the `llamantin_core::Provider` trait.
//! [`create_provider`] picks one based on configuration.

mod http;

pub mod factory;
pub mod ollama;
pub mod openai_compat;

pub use factory::create_provider;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
