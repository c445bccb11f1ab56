//! Routing / termination decision.

use crate::model::{Message, Role};

/// Where the loop goes after a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The latest message requests tool calls; execute them.
    Continue,
    /// The run is finished.
    End,
}

/// Decide from the latest message only.
///
/// Continue iff it is an assistant message carrying at least one tool call.
/// Unknown tool names do not short-circuit here; the executor resolves them.
pub fn route(latest: &Message) -> Decision {
    if latest.role == Role::Assistant && !latest.tool_calls().is_empty() {
        Decision::Continue
    } else {
        Decision::End
    }
}
