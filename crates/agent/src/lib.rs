//! # localmind agent
//!
//! The turn orchestrator. One call to [`TurnOrchestrator::process_turn`]
//! takes a conversation, looks up context for the last user message, asks
//! the model for a reply, runs any tools it requests (up to a budget), and
//! returns the final answer together with the full message trace.

pub mod context;
mod dispatch;
pub mod orchestrator;
pub mod state;

#[cfg(test)]
mod test_helpers;

pub use context::augment_query;
pub use orchestrator::{HealthReport, NO_RESPONSE, TurnOrchestrator};
pub use state::{TurnOutcome, TurnState, TurnStatus, TurnStep};
