//! The turn orchestrator: retrieve context, generate, run tools, finalize.

use std::sync::Arc;

use chrono::Utc;
use localmind_config::AppConfig;
use localmind_core::event::{DomainEvent, EventBus};
use localmind_core::message::Message;
use localmind_core::provider::{Provider, ProviderRequest};
use localmind_core::retrieval::Retriever;
use localmind_core::tool::ToolRegistry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::augment_query;
use crate::dispatch::dispatch_all;
use crate::state::{TurnOutcome, TurnState, TurnStatus, TurnStep};

/// Text returned when a turn ends without any assistant message.
pub const NO_RESPONSE: &str = "No response generated";

/// Drives one conversational turn through its state machine.
///
/// A turn never fails from the caller's point of view: retrieval errors are
/// swallowed, tool faults become tool messages, and a model failure ends the
/// turn with status `error` and an explanatory assistant message.
pub struct TurnOrchestrator {
    /// The language-model gateway
    provider: Arc<dyn Provider>,

    /// Context lookup for the last user message
    retriever: Arc<dyn Retriever>,

    /// Tools offered to the model
    tools: Arc<ToolRegistry>,

    /// The model to request
    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Tool cycles allowed per turn
    max_iterations: u32,

    retrieval_limit: usize,

    retrieval_threshold: f32,

    /// Whether tool schemas go out with each completion request
    send_tool_schemas: bool,

    /// Run the calls of one cycle concurrently
    parallel_tools: bool,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

/// Reachability of the orchestrator's remote collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub llm: bool,
    pub vector_store: bool,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.llm && self.vector_store
    }
}

impl TurnOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        retriever: Arc<dyn Retriever>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            retriever,
            tools,
            model: "default".into(),
            temperature: 0.7,
            max_tokens: None,
            max_iterations: 3,
            retrieval_limit: 3,
            retrieval_threshold: 0.7,
            send_tool_schemas: true,
            parallel_tools: false,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Build an orchestrator with model, retrieval and loop settings from config.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        retriever: Arc<dyn Retriever>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let mut orchestrator = Self::new(provider, retriever, tools)
            .with_model(&config.llm.model)
            .with_temperature(config.llm.temperature)
            .with_max_iterations(config.orchestrator.max_iterations)
            .with_retrieval(config.retrieval.limit, config.retrieval.score_threshold)
            .with_tool_schemas(config.orchestrator.send_tool_schemas)
            .with_parallel_tools(config.orchestrator.parallel_tools);
        orchestrator.max_tokens = config.llm.max_tokens;
        orchestrator
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per completion.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the number of tool cycles allowed per turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set how many passages are retrieved and the minimum score to keep one.
    pub fn with_retrieval(mut self, limit: usize, score_threshold: f32) -> Self {
        self.retrieval_limit = limit;
        self.retrieval_threshold = score_threshold;
        self
    }

    pub fn with_tool_schemas(mut self, enabled: bool) -> Self {
        self.send_tool_schemas = enabled;
        self
    }

    pub fn with_parallel_tools(mut self, enabled: bool) -> Self {
        self.parallel_tools = enabled;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run one turn with the configured tool budget.
    pub async fn process_turn(&self, initial_messages: Vec<Message>) -> TurnOutcome {
        self.process_turn_with_budget(initial_messages, self.max_iterations)
            .await
    }

    /// Run one turn allowing at most `max_iterations` tool cycles.
    pub async fn process_turn_with_budget(
        &self,
        initial_messages: Vec<Message>,
        max_iterations: u32,
    ) -> TurnOutcome {
        let turn_id = uuid::Uuid::new_v4().to_string();
        info!(
            turn_id = %turn_id,
            messages = initial_messages.len(),
            max_iterations,
            "Processing turn"
        );

        let mut state = TurnState::new(initial_messages, max_iterations);
        let mut steps = vec![TurnStep::Start];
        let mut status = TurnStatus::Success;
        let mut final_text = String::new();

        loop {
            let next = match state.step {
                TurnStep::Start => {
                    self.retrieve_context(&turn_id, &mut state).await;
                    TurnStep::ContextRetrieved
                }
                TurnStep::ContextRetrieved | TurnStep::Tools => {
                    if state.step == TurnStep::Tools {
                        self.run_tools(&turn_id, &mut state).await;
                    }
                    if self.generate(&turn_id, &mut state).await {
                        TurnStep::ResponseGenerated
                    } else {
                        // The appended error message is the answer
                        status = TurnStatus::Error;
                        final_text = state
                            .last_assistant()
                            .map(|m| m.content.clone())
                            .unwrap_or_else(|| NO_RESPONSE.into());
                        TurnStep::Completed
                    }
                }
                TurnStep::ResponseGenerated => {
                    if state.should_run_tools() {
                        TurnStep::Tools
                    } else {
                        TurnStep::Finalize
                    }
                }
                TurnStep::Finalize => {
                    if !state.pending_tool_calls.is_empty() {
                        warn!(
                            turn_id = %turn_id,
                            dropped = state.pending_tool_calls.len(),
                            iterations = state.iteration_count,
                            "Tool budget exhausted, dropping pending tool calls"
                        );
                        state.pending_tool_calls.clear();
                    }
                    match state.last_assistant() {
                        Some(msg) => final_text = msg.content.clone(),
                        None => {
                            final_text = NO_RESPONSE.into();
                            status = TurnStatus::Error;
                        }
                    }
                    TurnStep::Completed
                }
                TurnStep::Completed => break,
            };

            debug!(turn_id = %turn_id, from = %state.step, to = %next, "Turn step");
            state.step = next;
            steps.push(next);
        }

        self.event_bus.publish(DomainEvent::TurnCompleted {
            turn_id: turn_id.clone(),
            success: status.is_success(),
            iterations: state.iteration_count,
            timestamp: Utc::now(),
        });
        info!(
            turn_id = %turn_id,
            status = ?status,
            iterations = state.iteration_count,
            "Turn completed"
        );

        TurnOutcome {
            final_text,
            status,
            trace: state.messages,
            iteration_count: state.iteration_count,
            steps,
        }
    }

    async fn retrieve_context(&self, turn_id: &str, state: &mut TurnState) {
        let Some(idx) = state.last_user_index() else {
            debug!(turn_id = %turn_id, "No user message to retrieve context for");
            return;
        };
        let query = state.messages[idx].content.clone();

        match self
            .retriever
            .search(&query, self.retrieval_limit, self.retrieval_threshold)
            .await
        {
            Ok(passages) => {
                debug!(turn_id = %turn_id, count = passages.len(), "Retrieved context");
                if !passages.is_empty() {
                    state.messages[idx].content = augment_query(&passages, &query);
                }
                self.event_bus.publish(DomainEvent::ContextRetrieved {
                    turn_id: turn_id.to_string(),
                    passages: passages.len(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(turn_id = %turn_id, retriever = self.retriever.name(), "Context retrieval failed: {e}");
                self.event_bus.publish(DomainEvent::RetrievalFailed {
                    turn_id: turn_id.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Call the model and append its message. Returns `false` if the model call failed.
    async fn generate(&self, turn_id: &str, state: &mut TurnState) -> bool {
        let mut request = ProviderRequest::new(&self.model, state.messages.clone());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        if self.send_tool_schemas {
            request.tools = self.tools.schemas().to_vec();
        }

        match self.provider.complete(request).await {
            Ok(response) => {
                let tool_calls = response.message.tool_calls.len();
                debug!(
                    turn_id = %turn_id,
                    model = %response.model,
                    tool_calls,
                    "Response generated"
                );
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    turn_id: turn_id.to_string(),
                    model: response.model,
                    tool_calls,
                    tokens_used: response.usage.map(|u| u.total_tokens),
                    timestamp: Utc::now(),
                });
                state.pending_tool_calls = response.message.tool_calls.clone();
                state.messages.push(response.message);
                true
            }
            Err(e) => {
                warn!(turn_id = %turn_id, provider = self.provider.name(), "Generation failed: {e}");
                self.event_bus.publish(DomainEvent::GenerationFailed {
                    turn_id: turn_id.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                state.pending_tool_calls.clear();
                state
                    .messages
                    .push(Message::assistant(format!("Error generating response: {e}")));
                false
            }
        }
    }

    /// Run every pending call and append one tool message per call, in call order.
    async fn run_tools(&self, turn_id: &str, state: &mut TurnState) {
        let calls = std::mem::take(&mut state.pending_tool_calls);
        let results = dispatch_all(&self.tools, &calls, self.parallel_tools).await;

        for done in results {
            let success = done.result.is_success();
            if !success {
                warn!(
                    turn_id = %turn_id,
                    tool = %done.tool_name,
                    error = done.result.error().unwrap_or_default(),
                    "Tool call failed"
                );
            }
            self.event_bus.publish(DomainEvent::ToolExecuted {
                turn_id: turn_id.to_string(),
                tool_name: done.tool_name,
                tool_call_id: done.result.tool_call_id().to_string(),
                success,
                duration_ms: done.duration.as_millis() as u64,
                timestamp: Utc::now(),
            });
            state.messages.push(done.result.into_message());
        }

        state.iteration_count += 1;
        debug!(turn_id = %turn_id, iteration = state.iteration_count, "Tool cycle complete");
    }

    /// Probe the model server and the vector store concurrently.
    pub async fn health(&self) -> HealthReport {
        let (llm, vector_store) = tokio::join!(self.provider.is_healthy(), self.retriever.health());
        HealthReport { llm, vector_store }
    }

    /// Send a tiny completion so the model server loads weights before the first turn.
    ///
    /// Returns whether it succeeded; failure is logged, never raised.
    pub async fn warm_up(&self) -> bool {
        let mut request = ProviderRequest::new(&self.model, vec![Message::user("Hello")]);
        request.max_tokens = Some(10);
        match self.provider.complete(request).await {
            Ok(_) => {
                info!(model = %self.model, "Model warm-up complete");
                true
            }
            Err(e) => {
                warn!(model = %self.model, "Model warm-up failed: {e}");
                false
            }
        }
    }
}
