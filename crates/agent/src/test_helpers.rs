//! Shared test doubles for orchestrator tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use localmind_core::error::{ProviderError, RetrievalError, ToolError};
use localmind_core::message::{Message, MessageToolCall};
use localmind_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use localmind_core::retrieval::{RetrievedPassage, Retriever};
use localmind_core::tool::{Tool, ToolSchema};

/// A provider that replays scripted responses and records every request.
///
/// Panics if more calls are made than responses provided, unless a
/// repeating response was set.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    repeat: Option<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
    healthy: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![
            Ok(make_tool_call_response(tool_calls, "")),
            Ok(make_text_response(answer)),
        ])
    }

    /// Answer every call with the same response.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(vec![])
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        match &self.repeat {
            Some(response) => Ok(response.clone()),
            None => panic!("ScriptedProvider: no more responses (call #{call})"),
        }
    }

    async fn is_healthy(&self) -> bool {
        self.healthy
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls(thought, tool_calls),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall::new(id, name, &args)
}

/// Returns fixed passages, ranked the way a real backend would.
pub struct StaticRetriever {
    pub passages: Vec<RetrievedPassage>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    pub fn new(texts: &[(&str, f32)]) -> Self {
        let passages = texts
            .iter()
            .enumerate()
            .map(|(i, (text, score))| RetrievedPassage {
                id: format!("doc-{i}"),
                score: *score,
                text: text.to_string(),
                metadata: Default::default(),
            })
            .collect();
        Self {
            passages,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(localmind_core::retrieval::rank_passages(
            self.passages.clone(),
            limit,
            score_threshold,
        ))
    }

    async fn health(&self) -> bool {
        true
    }
}

/// Fails every search.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _: &str, _: usize, _: f32) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        Err(RetrievalError::Index("connection refused".into()))
    }

    async fn health(&self) -> bool {
        false
    }
}

/// `get_map`-shaped tool with one fixed entry.
pub struct FixtureMapTool;

#[async_trait]
impl Tool for FixtureMapTool {
    fn name(&self) -> &str {
        "get_map"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "get_map",
            "Fetch a map by key",
            serde_json::json!({
                "type": "object",
                "properties": {"key": {"type": "string"}},
                "required": ["key"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        match arguments["key"].as_str() {
            Some("engine_params") => Ok(serde_json::json!({
                "key": "engine_params",
                "data": {"rpm": 2500, "temperature": 85, "pressure": 2.3}
            })),
            Some(other) => Ok(serde_json::json!({"key": other, "data": null, "error": "Key not found"})),
            None => Err(ToolError::InvalidArguments("missing field `key`".into())),
        }
    }
}

/// Sleeps for `delay_ms`, then echoes `label`.
pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "slow",
            "Echo a label after a delay",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "label": {"type": "string"},
                    "delay_ms": {"type": "integer"}
                },
                "required": ["label"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(serde_json::json!({"label": arguments["label"]}))
    }
}

/// Sleeps for `delay_ms`, then appends `label` to a shared log.
pub struct RecordingTool {
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecordingTool {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        "record"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "record",
            "Write a label to the log after a delay",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "label": {"type": "string"},
                    "delay_ms": {"type": "integer"}
                },
                "required": ["label"]
            }),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let label = arguments["label"].as_str().unwrap_or_default().to_string();
        self.log.lock().unwrap().push(label);
        Ok(serde_json::json!({"written": true}))
    }
}

/// Always panics.
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "explode",
            "Panics",
            serde_json::json!({"type": "object", "properties": {}}),
        )
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        panic!("boom")
    }
}
