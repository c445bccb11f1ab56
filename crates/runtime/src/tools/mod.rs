//! Tool dispatch: the tool trait, the registry, and built-in tools.

pub mod builtin;
pub mod errors;
mod registry;
mod traits;

pub use errors::ToolError;
pub use registry::ToolRegistry;
pub use traits::Tool;
