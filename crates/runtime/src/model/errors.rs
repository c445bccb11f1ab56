use thiserror::Error;

/// Errors from LLM provider calls.
///
/// Any of these is fatal to the run that observed it; the loop performs no
/// implicit retry. Retry policy belongs to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The LLM provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The call exceeded the configured deadline.
    #[error("model call timed out after {0}ms")]
    Timeout(u64),
}
