//! Vetmap-Store: External Collaborator Layer
//!
//! This crate defines the abstractions the validation pipeline consumes as
//! external collaborators: prompt template lookup, requirement records,
//! document/object storage, extraction caching, and outcome persistence.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: backend-agnostic trait seams with in-memory fakes for testing.
//!
//! ## Key Components
//!
//! - `TemplateStore` / `RequirementStore` / `DocumentStore` /
//!   `ExtractionCache` / `OutcomeRepository`: the collaborator traits
//! - `fakes`: `Memory*` implementations satisfying the trait contracts
//! - `FsDocumentStore`: filesystem-backed document storage

mod error;
pub mod fakes;
mod fs;
pub mod traits;

pub use error::StoreError;
pub use fs::FsDocumentStore;
pub use traits::{
    DocumentDigest, DocumentStore, ExtractedDocument, ExtractedPage, ExtractedTable,
    ExtractionCache, GenerationConfig, OutcomeRecord, OutcomeRepository, PromptPhase,
    PromptTemplate, Requirement, RequirementStore, RequirementType, SourceDocument, StoreResult,
    TemplateStore,
};
