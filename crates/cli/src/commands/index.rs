//! `llamantin index` — Build the document store.

use llamantin_config::AppConfig;

pub async fn run(config: AppConfig, rebuild: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store_path = config.storage.store_path();

    if rebuild && store_path.exists() {
        tokio::fs::remove_file(&store_path).await?;
        println!("Removed {}", store_path.display());
    }

    let provider = llamantin_providers::create_provider(&config)?;
    let collector = llamantin_gateway::open_collector(&config, provider).await?;

    if collector.is_initialized() {
        println!("Store already built at {} (use --rebuild to start over)", store_path.display());
        return Ok(());
    }

    println!("Indexing {} ...", config.storage.data_dir.display());
    let indexed = collector.initialize().await?;
    println!("Indexed {indexed} documents into {}", store_path.display());

    Ok(())
}
