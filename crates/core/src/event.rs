//! Domain events emitted while a turn runs.
//!
//! The orchestrator publishes to an [`EventBus`]; anything interested (the
//! CLI trace printer, tests) subscribes. Publishing with no subscribers is a
//! no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Context was looked up for the last user message
    ContextRetrieved {
        turn_id: String,
        passages: usize,
        timestamp: DateTime<Utc>,
    },

    /// Context lookup failed and the turn continued without it
    RetrievalFailed {
        turn_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The model produced an assistant message
    ResponseGenerated {
        turn_id: String,
        model: String,
        tool_calls: usize,
        tokens_used: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// The model call failed; the turn ends with status `error`
    GenerationFailed {
        turn_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        turn_id: String,
        tool_name: String,
        tool_call_id: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The turn finished
    TurnCompleted {
        turn_id: String,
        success: bool,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
