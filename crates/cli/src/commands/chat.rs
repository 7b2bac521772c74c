//! `localmind chat` — Single-message or interactive chat.

use localmind_agent::{TurnOrchestrator, TurnOutcome};
use localmind_config::AppConfig;
use localmind_core::message::{Message, Role};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::build_orchestrator;

/// Render the messages a turn appended, one block per message.
pub fn format_trace(outcome: &TurnOutcome, input_len: usize) -> String {
    let mut out = String::new();
    for msg in outcome.new_messages(input_len) {
        match msg.role {
            Role::Assistant if msg.has_tool_calls() => {
                for call in &msg.tool_calls {
                    out.push_str(&format!("  [call {}] {}({})\n", call.id, call.name, call.arguments));
                }
                if !msg.content.is_empty() {
                    out.push_str(&format!("  [assistant] {}\n", msg.content));
                }
            }
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().unwrap_or("?");
                out.push_str(&format!("  [result {id}] {}\n", msg.content));
            }
            role => out.push_str(&format!("  [{role}] {}\n", msg.content)),
        }
    }
    out.push_str(&format!(
        "  [{:?}] {} tool cycle(s)\n",
        outcome.status, outcome.iteration_count
    ));
    out
}

/// History to carry into the next turn.
///
/// Starts from `input` as typed, so retrieved context is not repeated on
/// later turns, then appends what the turn produced. A trailing assistant
/// message whose tool calls were never run loses those calls, since every
/// call sent back to the model needs a matching tool message.
pub fn carry_history(input: Vec<Message>, outcome: &TurnOutcome) -> Vec<Message> {
    let input_len = input.len();
    let mut history = input;
    history.extend_from_slice(outcome.new_messages(input_len));

    if let Some(last) = history.last_mut() {
        if last.role == Role::Assistant && last.has_tool_calls() {
            last.tool_calls.clear();
            if last.content.trim().is_empty() {
                history.pop();
            }
        }
    }
    history
}

async fn turn(
    orchestrator: &TurnOrchestrator,
    messages: Vec<Message>,
    max_iterations: Option<u32>,
) -> TurnOutcome {
    let budget = max_iterations.unwrap_or(orchestrator.max_iterations());
    orchestrator.process_turn_with_budget(messages, budget).await
}

pub async fn run(
    config: &AppConfig,
    message: Option<String>,
    max_iterations: Option<u32>,
    show_trace: bool,
) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config)?;
    if config.orchestrator.warm_up {
        orchestrator.warm_up().await;
    }

    if let Some(msg) = message {
        // Single message mode
        let outcome = turn(&orchestrator, vec![Message::user(msg)], max_iterations).await;
        if show_trace {
            eprint!("{}", format_trace(&outcome, 1));
        }
        if !outcome.is_success() {
            anyhow::bail!("{}", outcome.final_text);
        }
        println!("{}", outcome.final_text);
        return Ok(());
    }

    // Interactive mode: each line is one turn carrying the history so far
    println!();
    println!("  localmind — interactive mode");
    println!("  Model:  {}", config.llm.model);
    println!("  Tools:  {}", orchestrator.tools().names().join(", "));
    println!("  Type 'exit' or press Ctrl+D to quit.");
    println!();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let mut messages = history.clone();
        messages.push(Message::user(line));
        let input_len = messages.len();

        let outcome = turn(&orchestrator, messages.clone(), max_iterations).await;
        if show_trace {
            eprint!("{}", format_trace(&outcome, input_len));
        }
        println!();
        for text_line in outcome.final_text.lines() {
            if outcome.is_success() {
                println!("  Assistant > {text_line}");
            } else {
                eprintln!("  [Error] {text_line}");
            }
        }
        println!();
        history = carry_history(messages, &outcome);
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use localmind_agent::{TurnStatus, TurnStep};
    use localmind_config::ToolsConfig;
    use localmind_core::error::{ProviderError, RetrievalError};
    use localmind_core::message::MessageToolCall;
    use localmind_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use localmind_core::retrieval::{RetrievedPassage, Retriever};
    use localmind_tools::default_registry;

    /// Calls `get_map` on the first `tool_rounds` requests, then answers.
    struct LoopingProvider {
        tool_rounds: usize,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    #[async_trait::async_trait]
    impl Provider for LoopingProvider {
        fn name(&self) -> &str {
            "looping"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let n = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request);
                requests.len()
            };
            let message = if n <= self.tool_rounds {
                let call = MessageToolCall::new(
                    format!("c{n}"),
                    "get_map",
                    &serde_json::json!({"key": "boost_target"}),
                );
                Message::assistant_with_tool_calls("", vec![call])
            } else {
                Message::assistant("Boost target is 1.2 bar.")
            };
            Ok(ProviderResponse {
                message,
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    struct OnePassage;

    #[async_trait::async_trait]
    impl Retriever for OnePassage {
        fn name(&self) -> &str {
            "one"
        }

        async fn search(&self, _: &str, _: usize, _: f32) -> Result<Vec<RetrievedPassage>, RetrievalError> {
            Ok(vec![RetrievedPassage {
                id: "doc-0".into(),
                score: 0.9,
                text: "boost target is 1.2 bar".into(),
                metadata: Default::default(),
            }])
        }

        async fn health(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn exhausted_turn_does_not_poison_next_turn() {
        // Budget 3 with 4 tool rounds: the first turn ends on unanswered calls
        let provider = Arc::new(LoopingProvider {
            tool_rounds: 4,
            requests: Mutex::new(Vec::new()),
        });
        let orch = TurnOrchestrator::new(
            provider.clone(),
            Arc::new(OnePassage),
            Arc::new(default_registry(&ToolsConfig::default())),
        );

        let first = vec![Message::user("what is the boost target?")];
        let outcome = turn(&orch, first.clone(), Some(3)).await;
        assert_eq!(outcome.iteration_count, 3);
        assert!(outcome.trace.last().unwrap().has_tool_calls());

        let mut second = carry_history(first, &outcome);
        second.push(Message::user("follow-up"));
        let outcome = turn(&orch, second, Some(3)).await;
        assert_eq!(outcome.status, TurnStatus::Success);
        assert_eq!(outcome.final_text, "Boost target is 1.2 bar.");

        let requests = provider.requests.lock().unwrap();
        let sent = &requests[4].messages;
        for (i, msg) in sent.iter().enumerate() {
            for call in &msg.tool_calls {
                assert!(
                    sent[i + 1..]
                        .iter()
                        .any(|m| m.tool_call_id.as_deref() == Some(call.id.as_str())),
                    "call {} sent without a result",
                    call.id
                );
            }
        }

        // Only the newest user message carries retrieved context
        let users: Vec<&str> = sent
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(users[0], "what is the boost target?");
        assert!(users[1].starts_with("Context: boost target is 1.2 bar"));
        assert!(users[1].ends_with("Query: follow-up"));
    }

    #[test]
    fn carry_history_keeps_text_of_unanswered_turn() {
        let call = MessageToolCall::new("c9", "get_map", &serde_json::json!({"key": "x"}));
        let input = vec![Message::user("q")];
        let outcome = TurnOutcome {
            final_text: "checking".into(),
            status: TurnStatus::Success,
            trace: vec![
                Message::user("Context: stale\n\nQuery: q"),
                Message::assistant_with_tool_calls("checking", vec![call]),
            ],
            iteration_count: 0,
            steps: vec![TurnStep::Start, TurnStep::Completed],
        };

        let history = carry_history(input, &outcome);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "q");
        assert_eq!(history[1].content, "checking");
        assert!(!history[1].has_tool_calls());
    }

    #[test]
    fn trace_shows_calls_and_results() {
        let call = MessageToolCall::new("c1", "get_map", &serde_json::json!({"key": "engine_params"}));
        let outcome = TurnOutcome {
            final_text: "RPM is 2500".into(),
            status: TurnStatus::Success,
            trace: vec![
                Message::user("q"),
                Message::assistant_with_tool_calls("", vec![call]),
                Message::tool_result("c1", "{\"rpm\":2500}"),
                Message::assistant("RPM is 2500"),
            ],
            iteration_count: 1,
            steps: vec![TurnStep::Start, TurnStep::Completed],
        };

        let out = format_trace(&outcome, 1);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  [call c1] get_map({\"key\":\"engine_params\"})");
        assert_eq!(lines[1], "  [result c1] {\"rpm\":2500}");
        assert_eq!(lines[2], "  [assistant] RPM is 2500");
        assert_eq!(lines[3], "  [Success] 1 tool cycle(s)");
    }
}
