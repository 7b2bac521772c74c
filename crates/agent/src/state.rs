//! Per-turn state and the outcome handed back to the caller.

use localmind_core::message::{Message, MessageToolCall, Role};
use serde::{Deserialize, Serialize};

/// Where a turn is in its lifecycle.
///
/// ```text
/// Start ─▶ ContextRetrieved ─▶ ResponseGenerated ─┬─▶ Finalize ─▶ Completed
///                                  ▲              │
///                                  └──── Tools ◀──┘
/// ```
///
/// A generation failure jumps straight to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStep {
    Start,
    ContextRetrieved,
    ResponseGenerated,
    Tools,
    Finalize,
    Completed,
}

impl std::fmt::Display for TurnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::ContextRetrieved => "context_retrieved",
            Self::ResponseGenerated => "response_generated",
            Self::Tools => "tools",
            Self::Finalize => "finalize",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Success,
    Error,
}

impl TurnStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Working state of one turn. Created at turn start, discarded at completion.
#[derive(Debug, Clone)]
pub struct TurnState {
    /// The conversation so far, including everything appended this turn
    pub messages: Vec<Message>,

    /// Tool calls from the latest assistant message that have not run yet
    pub pending_tool_calls: Vec<MessageToolCall>,

    pub step: TurnStep,

    /// Completed tool cycles
    pub iteration_count: u32,

    pub max_iterations: u32,
}

impl TurnState {
    pub fn new(messages: Vec<Message>, max_iterations: u32) -> Self {
        Self {
            messages,
            pending_tool_calls: Vec::new(),
            step: TurnStep::Start,
            iteration_count: 0,
            max_iterations,
        }
    }

    /// Another tool cycle is due: calls are pending and budget remains.
    pub fn should_run_tools(&self) -> bool {
        !self.pending_tool_calls.is_empty() && self.iteration_count < self.max_iterations
    }

    /// The most recent assistant message, if the turn produced one.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Index of the last user-role message.
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == Role::User)
    }
}

/// What a turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub final_text: String,
    pub status: TurnStatus,

    /// Every message in the turn, inputs included, in order
    pub trace: Vec<Message>,

    pub iteration_count: u32,

    /// Steps visited, in order, ending with `Completed`
    pub steps: Vec<TurnStep>,
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Messages appended during the turn, excluding the caller's input.
    pub fn new_messages(&self, input_len: usize) -> &[Message] {
        self.trace.get(input_len..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> MessageToolCall {
        MessageToolCall::new(id, "get_map", &serde_json::json!({"key": "k"}))
    }

    #[test]
    fn tools_need_pending_calls_and_budget() {
        let mut state = TurnState::new(vec![Message::user("q")], 2);
        assert!(!state.should_run_tools());

        state.pending_tool_calls.push(call("c1"));
        assert!(state.should_run_tools());

        state.iteration_count = 2;
        assert!(!state.should_run_tools());
    }

    #[test]
    fn zero_budget_never_runs_tools() {
        let mut state = TurnState::new(vec![], 0);
        state.pending_tool_calls.push(call("c1"));
        assert!(!state.should_run_tools());
    }

    #[test]
    fn last_assistant_skips_tool_messages() {
        let state = TurnState::new(
            vec![
                Message::user("q"),
                Message::assistant("first"),
                Message::tool_result("c1", "{}"),
            ],
            3,
        );
        assert_eq!(state.last_assistant().unwrap().content, "first");
    }

    #[test]
    fn no_assistant_message() {
        let state = TurnState::new(vec![Message::user("q"), Message::system("s")], 3);
        assert!(state.last_assistant().is_none());
        assert_eq!(state.last_user_index(), Some(0));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TurnStatus::Success).unwrap(), "\"success\"");
        assert_eq!(serde_json::to_string(&TurnStatus::Error).unwrap(), "\"error\"");
        assert_eq!(
            serde_json::to_string(&TurnStep::ContextRetrieved).unwrap(),
            "\"context_retrieved\""
        );
        assert_eq!(TurnStep::ResponseGenerated.to_string(), "response_generated");
    }
}
