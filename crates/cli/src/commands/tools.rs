//! `localmind tools` — Inspect and run the built-in tools.

use anyhow::Context;
use localmind_config::AppConfig;
use localmind_tools::default_registry;

pub fn list(config: &AppConfig) -> anyhow::Result<()> {
    let registry = default_registry(&config.tools);

    println!("🔧 Built-in tools");
    println!("=================");
    for schema in registry.schemas() {
        println!();
        println!("  {}", schema.name);
        println!("    {}", schema.description);

        let required = schema.required_params();
        if let Some(props) = schema.parameters["properties"].as_object() {
            for (param, spec) in props {
                let kind = spec["type"].as_str().unwrap_or("any");
                let flag = if required.contains(&param.as_str()) { "required" } else { "optional" };
                println!("    - {param}: {kind} ({flag})");
            }
        }
    }
    Ok(())
}

pub async fn exec(config: &AppConfig, name: &str, args: &str, id: &str) -> anyhow::Result<()> {
    let arguments: serde_json::Value =
        serde_json::from_str(args).context("--args must be a JSON object")?;
    anyhow::ensure!(arguments.is_object(), "--args must be a JSON object");

    let registry = default_registry(&config.tools);
    let result = registry.execute(name, id, arguments).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_success() {
        anyhow::bail!("Tool '{name}' failed");
    }
    Ok(())
}
