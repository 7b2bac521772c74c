//! `localmind models` — List the models the server offers.

use localmind_config::AppConfig;
use localmind_core::provider::Provider;

use super::build_provider;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let provider = build_provider(config)?;
    let models = provider.list_models().await?;

    if models.is_empty() {
        println!("No models reported by {}", provider.base_url());
        return Ok(());
    }
    for model in &models {
        let marker = if *model == config.llm.model { "*" } else { " " };
        println!("{marker} {model}");
    }
    Ok(())
}
