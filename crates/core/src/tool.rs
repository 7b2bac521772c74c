//! Tool trait and registry.
//!
//! Tools are registered once at startup and the registry is then shared
//! read-only (`Arc<ToolRegistry>`). Dispatch never raises: unknown names,
//! bad arguments, tool errors and panics all come back as a [`ToolResult`]
//! whose `error` is set.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::message::{Message, MessageToolCall};

/// A parsed request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Parse the JSON-text arguments of a model-emitted tool call.
    ///
    /// An empty argument string is read as `{}`.
    pub fn parse(call: &MessageToolCall) -> Result<Self, ToolError> {
        let raw = call.arguments.trim();
        let arguments = if raw.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };
        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        })
    }
}

/// The outcome of one tool call. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    tool_call_id: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Fold into a `tool` message: structured data as JSON text, errors as plain text.
    pub fn into_message(self) -> Message {
        let content = match (self.result, self.error) {
            (_, Some(error)) => error,
            (Some(value), None) => value.to_string(),
            (None, None) => String::new(),
        };
        Message::tool_result(self.tool_call_id, content)
    }
}

/// The machine-readable declaration of a tool, sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the parameters
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// The function-calling shape: `{type: "function", function: {...}}`.
    pub fn function_spec(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }

    /// Names listed under the schema's `required` key.
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters["required"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// An invocable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The declared contract. Must be stable for the life of the process.
    fn schema(&self) -> ToolSchema;

    /// The unique name of this tool (e.g., "get_map").
    fn name(&self) -> &str;

    /// Execute with a JSON argument object and return structured output.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// Decode a JSON argument object into a tool's typed parameter struct.
pub fn parse_args<T: serde::de::DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// The static set of tools available to the model.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    schemas: Vec<ToolSchema>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            schemas: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name replaces the earlier one in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let schema = tool.schema();
        match self.index.get(&schema.name) {
            Some(&slot) => {
                self.tools[slot] = tool;
                self.schemas[slot] = schema;
            }
            None => {
                self.index.insert(schema.name.clone(), self.tools.len());
                self.tools.push(tool);
                self.schemas.push(schema);
            }
        }
    }

    /// Tool schemas in registration order.
    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    /// Registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a named tool. Never fails; faults are returned as data.
    pub async fn execute(
        &self,
        name: &str,
        call_id: &str,
        arguments: serde_json::Value,
    ) -> ToolResult {
        let Some(&slot) = self.index.get(name) else {
            return ToolResult::failure(call_id, ToolError::NotFound(name.to_string()).to_string());
        };

        let outcome = AssertUnwindSafe(self.tools[slot].execute(arguments))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => ToolResult::success(call_id, value),
            Ok(Err(e)) => {
                tracing::debug!(tool = %name, error = %e, "Tool returned an error");
                ToolResult::failure(call_id, e.to_string())
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                tracing::warn!(tool = %name, %reason, "Tool panicked");
                ToolResult::failure(
                    call_id,
                    ToolError::ExecutionFailed {
                        tool_name: name.to_string(),
                        reason,
                    }
                    .to_string(),
                )
            }
        }
    }

    /// Execute a parsed call.
    pub async fn dispatch(&self, call: ToolCall) -> ToolResult {
        self.execute(&call.name, &call.id, call.arguments).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct EchoArgs {
        text: String,
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                "echo",
                "Echoes back the input",
                serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            )
        }

        async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
            let args: EchoArgs = parse_args(arguments)?;
            Ok(serde_json::json!({ "echo": args.text }))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "boom"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new("boom", "Always panics", serde_json::json!({"type": "object"}))
        }

        async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
            panic!("tool blew up");
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(PanickingTool));
        registry
    }

    #[test]
    fn schemas_keep_registration_order() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["echo", "boom"]);
        assert_eq!(registry.schemas()[0].required_params(), vec!["text"]);
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = registry();
        registry.register(Box::new(EchoTool));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["echo", "boom"]);
    }

    #[test]
    fn function_spec_shape() {
        let spec = EchoTool.schema().function_spec();
        assert_eq!(spec["type"], "function");
        assert_eq!(spec["function"]["name"], "echo");
        assert_eq!(spec["function"]["parameters"]["required"][0], "text");
    }

    #[tokio::test]
    async fn execute_success() {
        let result = registry()
            .execute("echo", "call_1", serde_json::json!({"text": "hello"}))
            .await;
        assert!(result.is_success());
        assert_eq!(result.tool_call_id(), "call_1");
        assert_eq!(result.result().unwrap()["echo"], "hello");
        assert!(result.error().is_none());
    }

    #[tokio::test]
    async fn unknown_tool_is_data_not_fault() {
        let result = registry()
            .execute("does_not_exist", "c9", serde_json::json!({}))
            .await;
        assert_eq!(result.error(), Some("Unknown tool: does_not_exist"));
        assert!(result.result().is_none());
    }

    #[tokio::test]
    async fn bad_arguments_become_error() {
        let result = registry()
            .execute("echo", "c2", serde_json::json!({"txt": "typo"}))
            .await;
        assert!(result.result().is_none());
        assert!(result.error().unwrap().starts_with("Invalid tool arguments"));
    }

    #[tokio::test]
    async fn panic_is_captured() {
        let result = registry().execute("boom", "c3", serde_json::json!({})).await;
        let err = result.error().unwrap();
        assert!(err.contains("boom"));
        assert!(err.contains("tool blew up"));
    }

    #[test]
    fn into_message_serializes_success_as_json() {
        let msg = ToolResult::success("c1", serde_json::json!({"rpm": 2500})).into_message();
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        let parsed: serde_json::Value = serde_json::from_str(&msg.content).unwrap();
        assert_eq!(parsed["rpm"], 2500);
    }

    #[test]
    fn into_message_surfaces_error_text() {
        let msg = ToolResult::failure("c1", "Unknown tool: x").into_message();
        assert_eq!(msg.content, "Unknown tool: x");
    }

    #[test]
    fn parse_tool_call_arguments() {
        let raw = MessageToolCall {
            id: "c1".into(),
            name: "get_map".into(),
            arguments: r#"{"key":"engine_params"}"#.into(),
        };
        let call = ToolCall::parse(&raw).unwrap();
        assert_eq!(call.arguments["key"], "engine_params");
    }

    #[test]
    fn parse_empty_arguments_as_object() {
        let raw = MessageToolCall {
            id: "c1".into(),
            name: "x".into(),
            arguments: "  ".into(),
        };
        assert!(ToolCall::parse(&raw).unwrap().arguments.is_object());
    }

    #[test]
    fn parse_invalid_arguments_fails() {
        let raw = MessageToolCall {
            id: "c1".into(),
            name: "x".into(),
            arguments: "{not json".into(),
        };
        assert!(matches!(ToolCall::parse(&raw), Err(ToolError::InvalidArguments(_))));
    }
}
