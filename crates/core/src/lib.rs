//! # localmind core
//!
//! Domain types, traits, and error definitions for the localmind turn
//! orchestrator. This crate has no HTTP or storage dependencies; it defines
//! the model every other crate implements against.
//!
//! The three collaborators of a conversational turn are traits here:
//! - [`Provider`]: the language-model gateway
//! - [`Retriever`]: the context retriever
//! - [`Tool`] (held in a [`ToolRegistry`]): the invocable tools
//!
//! Implementations live in their own crates, so tests can swap in doubles
//! without touching the orchestrator.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, RetrievalError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use retrieval::{RetrievedPassage, Retriever};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
