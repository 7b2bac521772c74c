//! localmind CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — One turn (`-m`) or a line-oriented conversation
//! - `health`  — Probe the model server and the vector store
//! - `tools`   — List the built-in tools or run one directly
//! - `ingest`  — Chunk files and store them for retrieval
//! - `models`  — List the models the server offers
//! - `config`  — Validate or print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "localmind",
    about = "localmind — tool-calling turn orchestrator for local language models",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (default: ~/.localmind/config.toml)
    #[arg(short, long, global = true, env = "LOCALMIND_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override the tool-cycle budget for each turn
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Print every message of the turn, not just the answer
        #[arg(long)]
        show_trace: bool,
    },

    /// Check model server and vector store health
    Health,

    /// Built-in tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },

    /// Chunk files and add them to the retrieval index
    Ingest {
        /// Text files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum characters per chunk
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,
    },

    /// List models served by the model server
    Models,

    /// Validate configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
enum ToolsCommand {
    /// List tools and their parameters
    List,

    /// Execute a tool directly
    Exec {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Call id reported in the result
        #[arg(long, default_value = "cli")]
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;

    // Initialize tracing; RUST_LOG wins over -v, which wins over the config
    let level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Chat {
            message,
            max_iterations,
            show_trace,
        } => commands::chat::run(&config, message, max_iterations, show_trace).await?,
        Commands::Health => commands::health::run(&config).await?,
        Commands::Tools { command } => match command {
            ToolsCommand::List => commands::tools::list(&config)?,
            ToolsCommand::Exec { name, args, id } => {
                commands::tools::exec(&config, &name, &args, &id).await?
            }
        },
        Commands::Ingest { files, chunk_size } => {
            commands::ingest::run(&config, &files, chunk_size).await?
        }
        Commands::Models => commands::models::run(&config).await?,
        Commands::Config { show } => commands::config_cmd::run(&config, cli.config.as_deref(), show)?,
    }

    Ok(())
}
