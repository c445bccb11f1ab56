use crate::model::{Message, ModelError};
use thiserror::Error;

/// Why a run terminated without reaching a final answer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunErrorKind {
    /// The model backend failed or timed out.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Cancellation was observed at a step boundary.
    #[error("run cancelled")]
    Cancelled,

    /// The configured turn limit was reached before the model finished.
    #[error("turn limit of {0} reached")]
    TurnLimit(usize),
}

/// A failed run.
///
/// Always carries the transcript as accumulated up to the failure, never a
/// silent empty result.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct RunError {
    pub transcript: Vec<Message>,
    #[source]
    pub kind: RunErrorKind,
}

impl RunError {
    pub fn new(transcript: Vec<Message>, kind: impl Into<RunErrorKind>) -> Self {
        Self {
            transcript,
            kind: kind.into(),
        }
    }
}
