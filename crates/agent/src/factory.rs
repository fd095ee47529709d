//! Builds the agent a request asks for.

use std::sync::Arc;

use llamantin_config::AppConfig;
use llamantin_core::document::DocumentStore;
use llamantin_core::error::Error;
use llamantin_core::event::EventBus;
use llamantin_core::provider::Provider;
use llamantin_core::tool::ToolRegistry;
use llamantin_tools::{DuckDuckGoSearchTool, SerperSearchTool};
use tracing::debug;

use crate::loop_runner::AgentLoop;
use crate::patterns::{AgentKind, DocSearchAgent, SearchAgent, WebSearchAgent};

/// Everything needed to assemble any [`AgentKind`].
///
/// Shared by all requests; each `create` call builds a fresh agent with its
/// own registry.
#[derive(Clone)]
pub struct AgentFactory {
    config: Arc<AppConfig>,
    provider: Arc<dyn Provider>,
    event_bus: Arc<EventBus>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl AgentFactory {
    pub fn new(config: Arc<AppConfig>, provider: Arc<dyn Provider>, event_bus: Arc<EventBus>) -> Self {
        Self {
            config,
            provider,
            event_bus,
            store: None,
        }
    }

    /// Attach the document store used by [`AgentKind::DocSearch`].
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// An agent loop over `tools`, configured from the shared settings.
    pub fn agent_loop(&self, tools: ToolRegistry) -> AgentLoop {
        AgentLoop::new(
            Arc::clone(&self.provider),
            self.config.llm.model.clone(),
            self.config.llm.temperature,
            Arc::new(tools),
            Arc::clone(&self.event_bus),
        )
        .with_max_steps(self.config.agent.step_budget())
    }

    pub fn create(&self, kind: AgentKind) -> Result<Box<dyn SearchAgent>, Error> {
        debug!(agent = kind.as_str(), "Creating agent");

        let agent: Box<dyn SearchAgent> = match kind {
            AgentKind::GoogleSearch => {
                let api_key = self.config.search.serper_api_key.clone().ok_or_else(|| Error::Config {
                    message: "SERPER_API_KEY is required for google_search".into(),
                })?;
                let tools = ToolRegistry::new().with(Box::new(SerperSearchTool::new(api_key)));
                Box::new(WebSearchAgent::new(kind, self.agent_loop(tools)))
            }
            AgentKind::DuckSearch => {
                let tools = ToolRegistry::new().with(Box::new(DuckDuckGoSearchTool::new()));
                Box::new(WebSearchAgent::new(kind, self.agent_loop(tools)))
            }
            AgentKind::DocSearch => {
                let store = self.store.clone().ok_or_else(|| Error::Config {
                    message: "doc_search needs a document store".into(),
                })?;
                Box::new(
                    DocSearchAgent::new(self.agent_loop(ToolRegistry::new()), store)
                        .with_cutoff(self.config.search.cutoff)
                        .with_top_k(self.config.search.top_k),
                )
            }
        };

        Ok(agent)
    }
}
