//! `localmind config` — Validate or print the effective configuration.

use std::path::Path;

use localmind_config::AppConfig;

/// The configuration with secrets masked, as TOML.
pub fn redacted_toml(config: &AppConfig) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if !shown.llm.api_key.is_empty() {
        shown.llm.api_key = "[REDACTED]".into();
    }
    Ok(toml::to_string_pretty(&shown)?)
}

pub fn run(config: &AppConfig, path: Option<&Path>, show: bool) -> anyhow::Result<()> {
    if show {
        println!("{}", redacted_toml(config)?);
        return Ok(());
    }

    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("🔍 Configuration");
    if path.exists() {
        println!("   ✅ {} parsed and valid", path.display());
    } else {
        println!("   ⚠️  {} not found, using defaults", path.display());
    }
    println!();
    println!("   Model server:  {}", config.llm.base_url);
    println!("   Model:         {}", config.llm.model);
    println!("   Retrieval:     {:?} (limit {}, threshold {})",
        config.retrieval.backend, config.retrieval.limit, config.retrieval.score_threshold);
    println!("   Tool budget:   {} cycle(s) per turn", config.orchestrator.max_iterations);
    println!(
        "   Workspace:     {}",
        config.tools.workspace_root.as_deref().unwrap_or("(unrestricted)")
    );
    Ok(())
}
