//! Error types for vetmap-providers

use thiserror::Error;

/// Errors produced by the AI backend clients.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Required configuration is absent (credentials, store reference,
    /// inline document text). Fatal to the single call it affects.
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    /// Network-level failure reaching the backend.
    #[error("Provider transport error: {0}")]
    Transport(String),

    /// A long-running operation did not complete within its deadline.
    #[error("Operation timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// The backend accepted the call but returned an error payload.
    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend returned a well-formed response missing the expected
    /// content (e.g. no candidates, no message).
    #[error("Provider returned an empty response: {0}")]
    EmptyResponse(String),

    /// The operation is not supported by this backend.
    #[error("Operation not supported by the {provider} backend: {operation}")]
    Unsupported {
        provider: String,
        operation: String,
    },
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
