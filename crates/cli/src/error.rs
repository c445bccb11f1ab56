//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means no run has been recorded yet.
    #[error("database not found at {path}. Run 'tiller run <prompt>' first")]
    DatabaseNotFound { path: PathBuf },

    /// No run was found matching the given prefix.
    #[error("no run found matching '{prefix}'")]
    RunNotFound { prefix: String },

    /// Multiple runs match the given prefix.
    ///
    /// The user should provide a longer prefix to disambiguate.
    #[error("multiple runs match '{prefix}': {matches:?}")]
    AmbiguousRun {
        prefix: String,
        matches: Vec<String>,
    },

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(String),

    /// A run terminated with a fatal error.
    #[error("run failed: {0}")]
    Run(runtime::RunErrorKind),

    /// Duplicate or otherwise invalid tool registration at startup.
    #[error("tool registration: {0}")]
    Tool(#[from] runtime::ToolError),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
