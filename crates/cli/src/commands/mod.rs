//! Subcommand implementations and the wiring they share.

pub mod chat;
pub mod config_cmd;
pub mod health;
pub mod ingest;
pub mod models;
pub mod tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use localmind_agent::TurnOrchestrator;
use localmind_config::AppConfig;
use localmind_providers::OpenAiCompatProvider;
use localmind_retrieval::RetrievalStack;

/// Load `path` if given, else the default config file; env overrides apply either way.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => AppConfig::load().context("Failed to load config"),
    }
}

pub fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<OpenAiCompatProvider>> {
    let provider = OpenAiCompatProvider::from_config(&config.llm)
        .context("Failed to create model client")?;
    Ok(Arc::new(provider))
}

pub fn build_retrieval(config: &AppConfig) -> anyhow::Result<RetrievalStack> {
    localmind_retrieval::build_from_config(&config.retrieval)
        .context("Failed to create retrieval backend")
}

/// Wire provider, retriever and the built-in tools into an orchestrator.
pub fn build_orchestrator(config: &AppConfig) -> anyhow::Result<TurnOrchestrator> {
    let provider = build_provider(config)?;
    let retrieval = build_retrieval(config)?;
    let tools = Arc::new(localmind_tools::default_registry(&config.tools));
    Ok(TurnOrchestrator::from_config(
        config,
        provider,
        retrieval.retriever,
        tools,
    ))
}
