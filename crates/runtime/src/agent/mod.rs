//! The agent loop: routing, tool execution, and the run driver.

mod errors;
mod executor;
mod route;
mod runner;

pub use errors::{RunError, RunErrorKind};
pub use route::{Decision, route};
pub use runner::{RunOutcome, Runner};
