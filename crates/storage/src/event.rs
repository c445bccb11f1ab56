//! Event types for the run log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A unique identifier for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// The kind of event that occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A run started with this prompt.
    RunStart { prompt: String },
    /// A message was added to the transcript.
    Message { role: Role, content: String },
    /// The model requested a tool call.
    ToolCall {
        call_id: String,
        name: String,
        input: Value,
    },
    /// A tool call resolved.
    ToolResult {
        call_id: String,
        output: Value,
        is_error: bool,
    },
    /// The run terminated normally.
    RunEnd,
    /// The run was cancelled or failed; the reason is the error text.
    RunAborted { reason: String },
}

/// An event in the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(run_id: RunId, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn message(run_id: RunId, role: Role, content: impl Into<String>) -> Self {
        Self::new(
            run_id,
            EventKind::Message {
                role,
                content: content.into(),
            },
        )
    }
}
