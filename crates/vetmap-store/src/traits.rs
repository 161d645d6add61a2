//! Trait definitions for vetmap's external collaborators
//!
//! These traits define the core storage abstractions the validation
//! pipeline consumes:
//! - `TemplateStore`: keyed prompt template lookup
//! - `RequirementStore`: unit-of-competency requirement records
//! - `DocumentStore`: byte-level source document download
//! - `ExtractionCache`: persisted OCR/layout extraction results
//! - `OutcomeRepository`: validation outcome / remediation persistence
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// Closed set of requirement categories a unit of competency is assessed
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    KnowledgeEvidence,
    PerformanceEvidence,
    FoundationSkill,
    ElementPerformanceCriterion,
    AssessmentCondition,
    AssessmentInstruction,
}

impl RequirementType {
    /// Stable iteration order used by batch validation runs.
    pub const ALL: [RequirementType; 6] = [
        RequirementType::KnowledgeEvidence,
        RequirementType::PerformanceEvidence,
        RequirementType::FoundationSkill,
        RequirementType::ElementPerformanceCriterion,
        RequirementType::AssessmentCondition,
        RequirementType::AssessmentInstruction,
    ];

    /// Human-readable label used in prompts and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::KnowledgeEvidence => "Knowledge Evidence",
            Self::PerformanceEvidence => "Performance Evidence",
            Self::FoundationSkill => "Foundation Skill",
            Self::ElementPerformanceCriterion => "Element / Performance Criterion",
            Self::AssessmentCondition => "Assessment Condition",
            Self::AssessmentInstruction => "Assessment Instruction",
        }
    }
}

impl std::fmt::Display for RequirementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One assessable unit-of-competency clause.
///
/// Immutable once fetched; sourced externally. Different underlying tables
/// use different column names for "text" and "number"; a backend
/// implementation normalizes those into this canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Stable identifier.
    pub id: String,

    /// Requirement category.
    pub requirement_type: RequirementType,

    /// Human-readable number/label (e.g. "KE1", "1.2").
    pub number: String,

    /// Full requirement text.
    pub text: String,

    /// Parent element text, where the category has one.
    pub element_text: Option<String>,
}

/// Requirement record lookup per unit of competency.
#[async_trait]
pub trait RequirementStore: Send + Sync {
    /// All requirements of one type for a unit, in source order.
    async fn requirements_for_unit(
        &self,
        unit_code: &str,
        requirement_type: RequirementType,
    ) -> StoreResult<Vec<Requirement>>;
}

// ---------------------------------------------------------------------------
// Prompt templates
// ---------------------------------------------------------------------------

/// Which pipeline phase a template serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPhase {
    /// Phase 1: requirement validation against document content.
    Validation,
    /// Phase 2: remediation (SMART) task generation.
    Generation,
}

/// Sampling configuration attached to a stored template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        // Low temperature keeps validation verdicts reproducible.
        Self {
            temperature: 0.1,
            max_output_tokens: 4096,
            top_p: None,
            top_k: None,
        }
    }
}

/// A stored prompt template, keyed by (phase, requirement type, document type).
///
/// `document_type = None` is the wildcard row used as a fallback when no
/// document-type-specific template exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub phase: PromptPhase,
    pub requirement_type: RequirementType,
    pub document_type: Option<String>,
    pub prompt_text: String,
    pub system_instruction: Option<String>,
    pub output_schema: Option<serde_json::Value>,
    pub generation_config: Option<GenerationConfig>,
    pub active: bool,
    pub is_default: bool,
}

/// Keyed prompt template lookup.
///
/// Guarantees:
/// - Inactive templates are never returned.
/// - When several rows match a key, `is_default` rows win.
/// - `document_type = None` selects the wildcard row only; the caller is
///   responsible for the specific-then-wildcard fallback ladder.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Find the active template for a key, if one exists.
    async fn find_template(
        &self,
        phase: PromptPhase,
        requirement_type: RequirementType,
        document_type: Option<&str>,
    ) -> StoreResult<Option<PromptTemplate>>;
}

// ---------------------------------------------------------------------------
// Source documents and extraction
// ---------------------------------------------------------------------------

/// A source document registered against a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Stable identifier.
    pub id: String,
    /// Display name (filename).
    pub name: String,
    /// Location in document/object storage.
    pub storage_path: String,
    /// Document category (e.g. "assessment", "learner_guide"), if known.
    pub document_type: Option<String>,
}

/// Content digest of raw document bytes (SHA-256 hex).
///
/// Used to make extraction idempotent: a cached extraction whose digest
/// matches the stored bytes is never redone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentDigest(String);

impl DocumentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        DocumentDigest(hex::encode(hasher.finalize()))
    }

    /// Full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for DocumentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A table recovered by layout analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// 1-based page the table appears on.
    pub page_number: u32,
    /// Row-major cell grid.
    pub rows: Vec<Vec<String>>,
}

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// 1-based page number.
    pub number: u32,
    /// Text fragments (lines/paragraphs) in reading order.
    pub fragments: Vec<String>,
}

/// Structured output of document extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Name of the document the text came from.
    pub document_name: String,
    /// Digest of the source bytes, when known.
    pub digest: Option<DocumentDigest>,
    /// Pages in order.
    pub pages: Vec<ExtractedPage>,
    /// Tables recovered alongside the page text.
    pub tables: Vec<ExtractedTable>,
}

impl ExtractedDocument {
    /// Total fragment count across all pages.
    pub fn fragment_count(&self) -> usize {
        self.pages.iter().map(|p| p.fragments.len()).sum()
    }
}

/// Byte-level download of source documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch raw document bytes by storage path.
    async fn download(&self, storage_path: &str) -> StoreResult<Vec<u8>>;
}

/// Persisted extraction results, keyed by document id.
///
/// Extraction is idempotent per document: callers check-then-extract-then-
/// persist. Concurrent extraction of the same never-before-seen document
/// produces equivalent content, so no locking is required here.
#[async_trait]
pub trait ExtractionCache: Send + Sync {
    /// Previously persisted extraction for a document, if any.
    async fn get(&self, document_id: &str) -> StoreResult<Option<ExtractedDocument>>;

    /// Persist an extraction result, replacing any prior entry.
    async fn put(&self, document_id: &str, document: &ExtractedDocument) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Outcome persistence
// ---------------------------------------------------------------------------

/// One persisted requirement result row, in the canonical result shape.
///
/// `status` holds the canonical string form ("Met" / "Partially Met" /
/// "Not Met"); the typed status enum never crosses the persistence
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub run_id: String,
    pub requirement_id: String,
    pub status: String,
    pub reasoning: String,
    pub mapped_content: String,
    pub citations: Vec<String>,
    pub unmapped_content: String,
    pub smart_task: String,
    pub benchmark_answer: String,
    /// True when the status reflects a tooling failure rather than a
    /// judgement about the documents.
    pub tooling_failure: bool,
    pub created_at: DateTime<Utc>,
}

/// Validation outcome / remediation persistence.
///
/// Guarantees:
/// - Rows are keyed by (run id, requirement id).
/// - `merge_remediation` overwrites only the remediation fields of an
///   existing row; citations and reasoning already stored are preserved.
#[async_trait]
pub trait OutcomeRepository: Send + Sync {
    /// Insert a batch of outcome rows for one run.
    async fn insert_many(&self, records: &[OutcomeRecord]) -> StoreResult<()>;

    /// Fetch one row by run and requirement.
    async fn find(
        &self,
        run_id: &str,
        requirement_id: &str,
    ) -> StoreResult<Option<OutcomeRecord>>;

    /// The most recently stored row for a requirement, across runs.
    async fn latest_for_requirement(
        &self,
        requirement_id: &str,
    ) -> StoreResult<Option<OutcomeRecord>>;

    /// Merge new remediation fields into an existing row without losing
    /// citations already stored. Fails if the row does not exist.
    async fn merge_remediation(
        &self,
        run_id: &str,
        requirement_id: &str,
        smart_task: &str,
        benchmark_answer: &str,
    ) -> StoreResult<()>;

    /// All rows for a run.
    async fn list_for_run(&self, run_id: &str) -> StoreResult<Vec<OutcomeRecord>>;
}
