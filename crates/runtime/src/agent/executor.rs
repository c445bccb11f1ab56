//! Tool-execution step.

use crate::model::{ToolCall, ToolResult};
use crate::tools::{ToolError, ToolRegistry};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

/// Execute a batch of tool calls and return one result per call.
///
/// Calls run concurrently, but the returned results match request order:
/// `join_all` yields outputs in the order of its input futures regardless of
/// completion order. The future resolves only once every call has settled.
pub(crate) async fn execute_calls(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    timeout: Option<Duration>,
) -> Vec<ToolResult> {
    debug!(count = calls.len(), "executing tool calls");
    join_all(calls.iter().map(|call| execute_one(registry, call, timeout))).await
}

async fn execute_one(
    registry: &ToolRegistry,
    call: &ToolCall,
    timeout: Option<Duration>,
) -> ToolResult {
    let Some(tool) = registry.lookup(&call.name) else {
        warn!(name = %call.name, "model requested unknown tool");
        return ToolResult::Failure {
            tool_call_id: call.id.clone(),
            error: ToolError::NotFound(call.name.clone()),
        };
    };

    debug!(name = %call.name, id = %call.id, "invoking tool");
    let invocation = tool.invoke(call.input.clone());
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, invocation).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolError::Timeout(limit.as_millis() as u64)),
        },
        None => invocation.await,
    };

    match outcome {
        Ok(output) => ToolResult::Success {
            tool_call_id: call.id.clone(),
            output,
        },
        Err(error) => {
            warn!(name = %call.name, %error, "tool call failed");
            ToolResult::Failure {
                tool_call_id: call.id.clone(),
                error,
            }
        }
    }
}
