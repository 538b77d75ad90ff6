//! Error types for the mint pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, MintError>;

/// Failures the mint pipeline must distinguish by kind
#[derive(Error, Debug)]
pub enum MintError {
    #[error("request timed out after {0} ms")]
    RequestTimeout(u64),

    #[error("network retries exhausted after {attempts} attempts: {last}")]
    NetworkRetryExhausted { attempts: usize, last: String },

    #[error("claim status check failed: {0}")]
    StatusCheckFailed(String),

    #[error("challenge unsolvable: {0}")]
    UnsolvableChallenge(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("malformed platform response: {0}")]
    Response(String),

    #[error("proxy configuration error: {0}")]
    Proxy(String),
}

impl From<serde_json::Error> for MintError {
    fn from(err: serde_json::Error) -> Self {
        MintError::Response(err.to_string())
    }
}
