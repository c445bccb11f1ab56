use thiserror::Error;

/// Errors from the run store.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An event payload could not be serialized to or from its JSON column.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No recorded run matches the given run id.
    #[error("run not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
