//! `llamantin config` — Configuration management commands.

use llamantin_config::{AppConfig, ConfigError};

pub fn show(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() {
    println!("{}", config_path().display());
}

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub fn validate(config: Result<AppConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Provider:  {}", config.llm.provider);
    println!("   Model:     {}", config.llm.model);
    println!("   Data dir:  {}", config.storage.data_dir.display());
    println!("   Store:     {}", config.storage.store_path().display());
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);

    Ok(())
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}

/// Settings that load fine but will make some agent fail later.
fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.search.serper_api_key.is_none() {
        warnings.push("No SERPER_API_KEY set: google_search is unavailable");
    }
    if config.llm.provider == "openai" && config.llm.openai_api_key.is_none() {
        warnings.push("LLM_PROVIDER is openai but OPENAI_API_KEY is not set");
    }
    if !config.storage.data_dir.is_dir() {
        warnings.push("DATA_DIR does not exist: doc_search will index nothing");
    }
    if config.agent.max_steps == 0 {
        warnings.push("agent.max_steps = 0 leaves runs unbounded");
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        assert!(config_path().to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn missing_serper_key_is_warned() {
        let config = AppConfig::default();
        assert!(warnings(&config).iter().any(|w| w.contains("SERPER_API_KEY")));
    }

    #[test]
    fn openai_without_key_is_warned() {
        let mut config = AppConfig::default();
        config.llm.provider = "openai".into();
        assert!(warnings(&config).iter().any(|w| w.contains("OPENAI_API_KEY")));
    }
}
