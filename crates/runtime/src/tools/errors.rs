use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during tool registration or execution.
///
/// `Duplicate` is a setup-time failure. Every other variant is recoverable
/// during a run: the executor records it as a failure result and the loop
/// continues.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool already registered: {0}")]
    Duplicate(String),
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
    #[error("execution failed: {0}")]
    Execution(String),
}
