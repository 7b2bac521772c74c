//! Tool-call dispatch for one tool cycle.
//!
//! Every call runs in its own spawned task. Dropping the turn future drops
//! the join handles, which detaches the tasks rather than cancelling them, so
//! a tool is never interrupted halfway through a side effect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use localmind_core::error::ToolError;
use localmind_core::message::MessageToolCall;
use localmind_core::tool::{ToolCall, ToolRegistry, ToolResult};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One finished call.
#[derive(Debug)]
pub(crate) struct Dispatched {
    pub tool_name: String,
    pub result: ToolResult,
    pub duration: Duration,
}

fn spawn_call(tools: Arc<ToolRegistry>, call: MessageToolCall) -> JoinHandle<Dispatched> {
    tokio::spawn(async move {
        let started = Instant::now();
        let result = match ToolCall::parse(&call) {
            Ok(parsed) => tools.dispatch(parsed).await,
            Err(ToolError::InvalidArguments(reason)) => ToolResult::failure(
                &call.id,
                format!("Tool execution error: invalid arguments: {reason}"),
            ),
            Err(e) => ToolResult::failure(&call.id, format!("Tool execution error: {e}")),
        };
        Dispatched {
            tool_name: call.name,
            result,
            duration: started.elapsed(),
        }
    })
}

async fn settle(call: &MessageToolCall, handle: JoinHandle<Dispatched>) -> Dispatched {
    match handle.await {
        Ok(done) => done,
        Err(e) => {
            warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool task failed");
            Dispatched {
                tool_name: call.name.clone(),
                result: ToolResult::failure(&call.id, format!("Tool execution error: {e}")),
                duration: Duration::ZERO,
            }
        }
    }
}

/// Run `calls` and return their results in call order.
///
/// Sequential mode waits for each call before starting the next. Parallel
/// mode starts them all at once; results are still returned in call order.
pub(crate) async fn dispatch_all(
    tools: &Arc<ToolRegistry>,
    calls: &[MessageToolCall],
    parallel: bool,
) -> Vec<Dispatched> {
    debug!(count = calls.len(), parallel, "Dispatching tool calls");

    if parallel {
        let handles: Vec<_> = calls
            .iter()
            .map(|call| spawn_call(Arc::clone(tools), call.clone()))
            .collect();
        futures::future::join_all(
            calls
                .iter()
                .zip(handles)
                .map(|(call, handle)| settle(call, handle)),
        )
        .await
    } else {
        let mut out = Vec::with_capacity(calls.len());
        for call in calls {
            let handle = spawn_call(Arc::clone(tools), call.clone());
            out.push(settle(call, handle).await);
        }
        out
    }
}
