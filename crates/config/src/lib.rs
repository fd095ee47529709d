//! Configuration loading, validation, and management for Llamantin.
//!
//! Loads configuration from `~/.llamantin/config.toml`, then applies
//! environment variable overrides (`LLM_PROVIDER`, `MODEL_NAME`,
//! `OLLAMA_BASE_URL`, `SERPER_API_KEY`, ...). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.llamantin/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Document store locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Search capabilities and doc-search tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Orchestration loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// WebSocket gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Default log filter (overridden by `RUST_LOG`)
    #[serde(default = "default_logging_level")]
    pub logging_level: String,
}

fn default_logging_level() -> String {
    "debug".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// The providers `llamantin-providers` knows how to build.
pub const SUPPORTED_PROVIDERS: &[&str] = &["ollama", "openai"];

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,

    /// Model used for document embeddings; `None` selects the offline hashing embedder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "mistral-nemo".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            ollama_base_url: default_ollama_base_url(),
            openai_api_key: None,
            openai_base_url: None,
            embedding_model: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory crawled into the document store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where the document store is persisted
    #[serde(default = "default_processed_data_dir")]
    pub processed_data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs_home().join("Documents")
}
fn default_processed_data_dir() -> PathBuf {
    PathBuf::from("./processed_data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            processed_data_dir: default_processed_data_dir(),
        }
    }
}

impl StorageConfig {
    /// The JSON file the vector store is saved to.
    pub fn store_path(&self) -> PathBuf {
        self.processed_data_dir.join("vector_db.json")
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serper_api_key: Option<String>,

    /// Minimum relevance a passage needs to reach the doc-search context
    #[serde(default = "default_cutoff")]
    pub cutoff: f32,

    /// How many passages to retrieve before filtering
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_cutoff() -> f32 {
    0.25
}
fn default_top_k() -> usize {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serper_api_key: None,
            cutoff: default_cutoff(),
            top_k: default_top_k(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("cutoff", &self.cutoff)
            .field("top_k", &self.top_k)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model consultations per run; 0 disables the limit
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    25
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

impl AgentConfig {
    /// The step budget as the loop wants it.
    pub fn step_budget(&self) -> Option<usize> {
        (self.max_steps > 0).then_some(self.max_steps)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.llamantin/config.toml),
    /// then apply environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    ///
    /// Variable names match the settings the server has always read.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = lookup("MODEL_NAME") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("MODEL_TEMPERATURE") {
            self.llm.temperature = parse_env("MODEL_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("OLLAMA_BASE_URL") {
            self.llm.ollama_base_url = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(v);
        }
        if let Some(v) = lookup("EMBEDDING_MODEL") {
            self.llm.embedding_model = Some(v);
        }
        if let Some(v) = lookup("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PROCESSED_DATA_DIR") {
            self.storage.processed_data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SERPER_API_KEY") {
            self.search.serper_api_key = Some(v);
        }
        if let Some(v) = lookup("LOGGING_LEVEL") {
            self.logging_level = v.to_lowercase();
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".llamantin")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.search.cutoff) {
            return Err(ConfigError::ValidationError(
                "search.cutoff must be between 0.0 and 1.0".into(),
            ));
        }

        if self.search.top_k == 0 {
            return Err(ConfigError::ValidationError("search.top_k must be > 0".into()));
        }

        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Unsupported LLM provider: {} (expected one of {})",
                self.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has an invalid value: {value}")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "mistral-nemo");
        assert_eq!(config.llm.ollama_base_url, "http://localhost:11434");
        assert!((config.search.cutoff - 0.25).abs() < f32::EPSILON);
        assert!(config.search.serper_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.provider, config.llm.provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("MODEL_NAME", "llama3.1"),
                ("MODEL_TEMPERATURE", "0.0"),
                ("SERPER_API_KEY", "serper-key"),
                ("PROCESSED_DATA_DIR", "/var/lib/llamantin"),
                ("LOGGING_LEVEL", "INFO"),
            ]))
            .unwrap();
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.search.serper_api_key.as_deref(), Some("serper-key"));
        assert_eq!(config.storage.store_path(), PathBuf::from("/var/lib/llamantin/vector_db.json"));
        assert_eq!(config.logging_level, "info");
    }

    #[test]
    fn bad_numeric_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("MODEL_TEMPERATURE", "warm")]))
            .unwrap_err();
        assert!(err.to_string().contains("MODEL_TEMPERATURE"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unsupported_provider_rejected() {
        let mut config = AppConfig::default();
        config.llm.provider = "invalid".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }

    #[test]
    fn zero_max_steps_means_unbounded() {
        let mut config = AppConfig::default();
        assert_eq!(config.agent.step_budget(), Some(25));
        config.agent.max_steps = 0;
        assert_eq!(config.agent.step_budget(), None);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().llm.provider, "ollama");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"

[search]
cutoff = 0.5

[gateway]
port = 9001
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.search.cutoff, 0.5);
        assert_eq!(config.search.top_k, 4);
        assert_eq!(config.gateway.port, 9001);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nprovider = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn secrets_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.search.serper_api_key = Some("super-secret".into());
        config.llm.openai_api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("mistral-nemo"));
        assert!(toml_str.contains("8000"));
    }
}
