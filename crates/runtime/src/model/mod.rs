//! Model protocol types and the backend trait.

pub mod backend;
pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, Message, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult, ToolSpec,
    Usage,
};
