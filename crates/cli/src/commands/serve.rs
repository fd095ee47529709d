//! `llamantin serve` — Start the WebSocket gateway.

use llamantin_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Llamantin Gateway");
    println!("   Listening: ws://{}:{}/ws/{{task_id}}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.llm.provider, config.llm.model);
    println!("   Documents: {}", config.storage.data_dir.display());

    llamantin_gateway::start(config).await?;

    Ok(())
}
