//! `llamantin ask` — Run one query and print the answer.

use std::sync::Arc;

use llamantin_agent::{AgentFactory, AgentKind};
use llamantin_config::AppConfig;
use llamantin_core::event::EventBus;
use tracing::info;

pub async fn run(config: AppConfig, kind: AgentKind, query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let provider = llamantin_providers::create_provider(&config)?;

    let collector = if kind == AgentKind::DocSearch {
        let collector = llamantin_gateway::open_collector(&config, Arc::clone(&provider)).await?;
        let indexed = collector.initialize().await?;
        if indexed > 0 {
            info!(indexed, "Indexed documents before answering");
        }
        Some(collector)
    } else {
        None
    };

    let mut factory = AgentFactory::new(Arc::new(config), provider, Arc::new(EventBus::default()));
    if let Some(collector) = &collector {
        factory = factory.with_store(collector.store());
    }
    let agent = factory.create(kind)?;

    tokio::select! {
        answer = agent.search(query) => {
            println!("{}", answer?);
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Cancelled.");
        }
    }

    Ok(())
}
