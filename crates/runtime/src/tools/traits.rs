//! Tool trait.

use crate::model::ToolSpec;
use crate::tools::ToolError;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools the model may invoke.
///
/// This is the boundary between the model loop and side effects.
/// Implementations are object-safe so the registry can hold them by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The specification advertised to the model.
    fn spec(&self) -> ToolSpec;

    /// Execute the tool with the supplied arguments.
    async fn invoke(&self, input: Value) -> Result<Value, ToolError>;
}
