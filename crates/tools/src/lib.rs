//! Capability implementations for Llamantin.
//!
//! Both web searches register under the same name, `search_query`, so an
//! agent carries exactly one of them.

mod common;

pub mod duckduckgo;
pub mod serper;

pub use duckduckgo::DuckDuckGoSearchTool;
pub use serper::SerperSearchTool;

/// Request timeout for search backends.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
