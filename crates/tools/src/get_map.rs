//! Keyed lookup tool — fetch a table or map by name.
//!
//! Backed by an in-memory table seeded with engine telemetry fixtures. The
//! table is fixed once the tool is registered.

use std::collections::BTreeMap;

use async_trait::async_trait;
use localmind_core::error::ToolError;
use localmind_core::tool::{Tool, ToolSchema, parse_args};
use serde::Deserialize;

const NAME: &str = "get_map";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    key: String,
}

pub struct GetMapTool {
    table: BTreeMap<String, serde_json::Value>,
}

impl GetMapTool {
    /// A tool over the built-in fixtures (`boost_target`, `engine_params`).
    pub fn new() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            "boost_target".to_string(),
            serde_json::json!({
                "anomalies": [
                    {"id": 1, "type": "pressure_drop", "severity": "high"},
                    {"id": 2, "type": "temperature_spike", "severity": "medium"}
                ],
                "status": "active",
                "last_updated": "2024-01-15T10:30:00Z"
            }),
        );
        table.insert(
            "engine_params".to_string(),
            serde_json::json!({"rpm": 2500, "temperature": 85, "pressure": 2.3}),
        );
        Self { table }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.table.insert(key.into(), value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl Default for GetMapTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GetMapTool {
    fn name(&self) -> &str {
        NAME
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Fetch a table, map, or data structure by key",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "description": "The key to fetch"
                    }
                },
                "required": ["key"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Args { key } = parse_args(arguments)?;

        // A missing key is an answer, not a failure
        Ok(match self.table.get(&key) {
            Some(data) => serde_json::json!({ "key": key, "data": data }),
            None => serde_json::json!({ "key": key, "data": null, "error": "Key not found" }),
        })
    }
}

/// Decode arguments without executing; used to keep the schema and `Args` in step.
#[cfg(test)]
pub(crate) fn decode_args(arguments: serde_json::Value) -> Result<(), ToolError> {
    parse_args::<Args>(arguments).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_key_returns_data() {
        let tool = GetMapTool::new();
        let out = tool.execute(serde_json::json!({"key": "engine_params"})).await.unwrap();
        assert_eq!(out["key"], "engine_params");
        assert_eq!(out["data"]["rpm"], 2500);
        assert_eq!(out["data"]["temperature"], 85);
        assert_eq!(out["data"]["pressure"], 2.3);
    }

    #[tokio::test]
    async fn boost_target_has_two_anomalies() {
        let out = GetMapTool::new()
            .execute(serde_json::json!({"key": "boost_target"}))
            .await
            .unwrap();
        assert_eq!(out["data"]["anomalies"].as_array().unwrap().len(), 2);
        assert_eq!(out["data"]["status"], "active");
    }

    #[tokio::test]
    async fn unknown_key_is_reported_in_band() {
        let out = GetMapTool::new()
            .execute(serde_json::json!({"key": "nope"}))
            .await
            .unwrap();
        assert!(out["data"].is_null());
        assert_eq!(out["error"], "Key not found");
    }

    #[tokio::test]
    async fn missing_or_extra_arguments_rejected() {
        let tool = GetMapTool::new();
        assert!(matches!(
            tool.execute(serde_json::json!({})).await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            tool.execute(serde_json::json!({"key": "a", "extra": 1})).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn custom_entries() {
        let tool = GetMapTool::new().with_entry("fuel_map", serde_json::json!([1, 2, 3]));
        assert!(tool.keys().any(|k| k == "fuel_map"));
        let out = tool.execute(serde_json::json!({"key": "fuel_map"})).await.unwrap();
        assert_eq!(out["data"][1], 2);
    }
}
