//! `localmind health` — Probe the model server and the vector store.

use localmind_config::AppConfig;

use super::build_orchestrator;

fn mark(ok: bool) -> &'static str {
    if ok { "✅ reachable" } else { "❌ unreachable" }
}

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let report = orchestrator.health().await;

    println!("🩺 localmind health");
    println!("===================");
    println!("  Model server:  {}  ({})", mark(report.llm), config.llm.base_url);
    println!(
        "  Vector store:  {}  ({:?})",
        mark(report.vector_store),
        config.retrieval.backend
    );
    println!();

    if !report.all_healthy() {
        anyhow::bail!("One or more services are unhealthy");
    }
    println!("  All services healthy");
    Ok(())
}
