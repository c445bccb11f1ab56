//! Tiller runtime — the agent loop and its collaborators.
//!
//! This crate provides the core runtime for driving a tool-using agent:
//! provider-agnostic model types, a tool registry, and the loop that
//! alternates between model calls and tool execution until the model
//! produces a final answer.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Runner**: Owns one run's transcript and drives the state machine
//!   (model call → routing decision → tool execution → model call …).
//! - **Backend**: A trait abstracting LLM providers (Ollama ships as the
//!   default adapter).
//! - **ToolRegistry**: Name-keyed tool dispatch, populated once at startup.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use runtime::{OllamaBackend, Runner, ToolRegistry};
//! use runtime::tools::builtin::{Add, ListFiles};
//!
//! # async fn example() -> Result<(), runtime::RunError> {
//! let mut registry = ToolRegistry::new();
//! registry.register(Arc::new(Add)).unwrap();
//! registry.register(Arc::new(ListFiles::default())).unwrap();
//!
//! let backend = OllamaBackend::builder("llama3.1").build();
//! let runner = Runner::new(backend, registry)
//!     .with_system("Answer using the tools available to you.");
//!
//! let outcome = runner.run("Count the files here and add 10.").await?;
//! println!("{}", outcome.transcript.last().map(|m| m.text()).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod model;
pub mod tools;

// Model types (provider-agnostic)
pub use model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    ToolSpec, Usage,
};

// Provider backends
pub use model::backend::{OllamaBackend, OllamaBackendBuilder};

// Tool registry and errors
pub use tools::{Tool, ToolError, ToolRegistry};

// The loop driver
pub use agent::{Decision, RunError, RunErrorKind, RunOutcome, Runner};
