//! The provider client seam.
//!
//! Exactly two backends implement [`ProviderClient`]: the grounded-search
//! client (answers from a pre-indexed remote document store) and the
//! text-injection client (requires extracted document text embedded in the
//! prompt). Callers hold a `Box<dyn ProviderClient>` built fresh per
//! orchestration call by the factory; no backend keeps state between calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vetmap_store::{ExtractedDocument, GenerationConfig};

use crate::error::ProviderResult;

/// Identity of a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Grounded-search backend (Gemini + File Search store).
    GroundedSearch,
    /// Text-injection backend (Azure OpenAI + Document Intelligence).
    TextInjection,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroundedSearch => write!(f, "grounded_search"),
            Self::TextInjection => write!(f, "text_injection"),
        }
    }
}

/// A single validation/generation request.
///
/// Exactly one grounding field is relevant per backend: the grounded-search
/// client requires `search_store`, the text-injection client requires
/// `document_text`. Each backend fails with a configuration error when its
/// field is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// The fully rendered user prompt.
    pub prompt: String,

    /// Optional system instruction.
    pub system_instruction: Option<String>,

    /// Named remote store reference (grounded-search backends).
    pub search_store: Option<String>,

    /// Pre-extracted document text (text-injection backends).
    pub document_text: Option<String>,

    /// Structured-output schema hint, when the template carries one.
    pub output_schema: Option<serde_json::Value>,

    /// Sampling configuration; backends apply deterministic defaults when
    /// absent.
    pub generation_config: Option<GenerationConfig>,
}

/// Response from a generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    /// Raw model text (typically JSON, possibly fenced or wrapped in prose).
    pub text: String,

    /// Which backend produced the response.
    pub provider_id: ProviderId,

    /// Citations harvested from grounding metadata, where the backend
    /// supplies them. Empty for backends without native grounding.
    pub citations: Vec<String>,
}

/// Metadata attached to an uploaded document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Unit of competency the document belongs to.
    pub unit_code: Option<String>,

    /// Document category (e.g. "assessment", "learner_guide").
    pub document_type: Option<String>,
}

/// Common interface over the two AI backends.
///
/// Secondary operations are backend-specific: `extract_document` exists
/// only on the text-injection backend, `upload_document` only on the
/// grounded-search backend. The other backend returns
/// `ProviderError::Unsupported`.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Backend identity.
    fn id(&self) -> ProviderId;

    /// Run one validation or generation call.
    async fn generate_validation(
        &self,
        request: GenerationRequest,
    ) -> ProviderResult<GenerationResponse>;

    /// OCR/layout extraction of a source document (text-injection backend).
    ///
    /// Polls the analysis operation until done; times out after ~120s.
    async fn extract_document(
        &self,
        bytes: &[u8],
        document_name: &str,
    ) -> ProviderResult<ExtractedDocument>;

    /// Upload a document into the remote search store (grounded-search
    /// backend).
    ///
    /// Polls the import operation until done; times out after ~60s.
    async fn upload_document(
        &self,
        bytes: &[u8],
        document_name: &str,
        store_ref: &str,
        metadata: UploadMetadata,
    ) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_display() {
        assert_eq!(ProviderId::GroundedSearch.to_string(), "grounded_search");
        assert_eq!(ProviderId::TextInjection.to_string(), "text_injection");
    }

    #[test]
    fn test_generation_request_default_has_no_grounding() {
        let request = GenerationRequest::default();
        assert!(request.search_store.is_none());
        assert!(request.document_text.is_none());
    }
}
