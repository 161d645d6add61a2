//! Pipeline-level error taxonomy.
//!
//! Most failures never surface here: parse and provider failures inside
//! Phase 1 / Phase 2 degrade to per-requirement outcomes so a batch always
//! completes. These variants cover the cases that genuinely cannot produce
//! a partial result.

use vetmap_providers::ProviderError;
use vetmap_store::StoreError;

/// Vetmap pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum VetmapError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("validation run was cancelled after {completed} requirement(s)")]
    Cancelled { completed: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for vetmap pipeline operations.
pub type Result<T> = std::result::Result<T, VetmapError>;
