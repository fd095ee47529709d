//! Llamantin CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the WebSocket gateway
//! - `ask`     — Run one query through an agent and print the answer
//! - `index`   — Build the document store from the data directory
//! - `config`  — Show, locate, create or validate the configuration

use clap::{Parser, Subcommand};
use llamantin_agent::AgentKind;
use llamantin_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "llamantin",
    about = "Llamantin — tool-calling search agents over the web and your documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question
    Ask {
        /// The question or search topic
        query: String,

        /// Which agent answers: google_search, duck_search or doc_search
        #[arg(short, long, default_value = "duck_search")]
        agent: AgentKind,
    },

    /// Index the data directory into the document store
    Index {
        /// Discard the saved store and index from scratch
        #[arg(long)]
        rebuild: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
    /// Check the configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize tracing: RUST_LOG wins, then --verbose, then LOGGING_LEVEL
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config
            .as_ref()
            .map(|c| c.logging_level.clone())
            .unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config?, port).await?,
        Commands::Ask { query, agent } => commands::ask::run(config?, agent, &query).await?,
        Commands::Index { rebuild } => commands::index::run(config?, rebuild).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config?)?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init => commands::config_cmd::init()?,
            ConfigAction::Validate => commands::config_cmd::validate(config)?,
        },
    }

    Ok(())
}
