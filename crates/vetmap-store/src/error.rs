//! Error types for vetmap-store

use thiserror::Error;

/// Errors that can occur in the external-collaborator layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document bytes could not be fetched
    #[error("Document not found at path: {0}")]
    DocumentNotFound(String),

    /// No outcome row matches the given run and requirement
    #[error("Outcome not found: run {run_id}, requirement {requirement_id}")]
    OutcomeNotFound {
        run_id: String,
        requirement_id: String,
    },

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Backend query error
    #[error("Store query failed: {0}")]
    Query(String),

    /// I/O error from a filesystem-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
