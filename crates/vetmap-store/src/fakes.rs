//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryTemplateStore`, `MemoryRequirementStore`,
//! `MemoryDocumentStore`, `MemoryExtractionCache`, and
//! `MemoryOutcomeRepository` that satisfy the trait contracts without any
//! external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::traits::*;

// ---------------------------------------------------------------------------
// MemoryTemplateStore
// ---------------------------------------------------------------------------

/// In-memory template store backed by a flat `Vec<PromptTemplate>`.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: Mutex<Vec<PromptTemplate>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template row.
    pub fn add(&self, template: PromptTemplate) {
        self.templates.lock().unwrap().push(template);
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn find_template(
        &self,
        phase: PromptPhase,
        requirement_type: RequirementType,
        document_type: Option<&str>,
    ) -> StoreResult<Option<PromptTemplate>> {
        let templates = self.templates.lock().unwrap();
        let mut matches: Vec<&PromptTemplate> = templates
            .iter()
            .filter(|t| {
                t.active
                    && t.phase == phase
                    && t.requirement_type == requirement_type
                    && t.document_type.as_deref() == document_type
            })
            .collect();
        // Default rows win ties.
        matches.sort_by_key(|t| if t.is_default { 0 } else { 1 });
        Ok(matches.first().map(|t| (*t).clone()))
    }
}

// ---------------------------------------------------------------------------
// MemoryRequirementStore
// ---------------------------------------------------------------------------

/// In-memory requirement store keyed by (unit code, requirement type).
#[derive(Debug, Default)]
pub struct MemoryRequirementStore {
    requirements: Mutex<HashMap<(String, RequirementType), Vec<Requirement>>>,
}

impl MemoryRequirementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a requirement under a unit code.
    pub fn add(&self, unit_code: &str, requirement: Requirement) {
        let mut map = self.requirements.lock().unwrap();
        map.entry((unit_code.to_string(), requirement.requirement_type))
            .or_default()
            .push(requirement);
    }
}

#[async_trait]
impl RequirementStore for MemoryRequirementStore {
    async fn requirements_for_unit(
        &self,
        unit_code: &str,
        requirement_type: RequirementType,
    ) -> StoreResult<Vec<Requirement>> {
        let map = self.requirements.lock().unwrap();
        Ok(map
            .get(&(unit_code.to_string(), requirement_type))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// In-memory document storage backed by `HashMap<path, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store document bytes under a path.
    pub fn put(&self, storage_path: &str, bytes: Vec<u8>) {
        self.documents
            .lock()
            .unwrap()
            .insert(storage_path.to_string(), bytes);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn download(&self, storage_path: &str) -> StoreResult<Vec<u8>> {
        let documents = self.documents.lock().unwrap();
        documents
            .get(storage_path)
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(storage_path.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MemoryExtractionCache
// ---------------------------------------------------------------------------

/// In-memory extraction cache keyed by document id.
#[derive(Debug, Default)]
pub struct MemoryExtractionCache {
    entries: Mutex<HashMap<String, ExtractedDocument>>,
}

impl MemoryExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached extractions (test assertion helper).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExtractionCache for MemoryExtractionCache {
    async fn get(&self, document_id: &str) -> StoreResult<Option<ExtractedDocument>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(document_id).cloned())
    }

    async fn put(&self, document_id: &str, document: &ExtractedDocument) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(document_id.to_string(), document.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryOutcomeRepository
// ---------------------------------------------------------------------------

/// In-memory outcome repository keyed by (run id, requirement id).
///
/// Insertion order is preserved so `latest_for_requirement` reflects the
/// most recent write.
#[derive(Debug, Default)]
pub struct MemoryOutcomeRepository {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl MemoryOutcomeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeRepository for MemoryOutcomeRepository {
    async fn insert_many(&self, records: &[OutcomeRecord]) -> StoreResult<()> {
        let mut store = self.records.lock().unwrap();
        store.extend_from_slice(records);
        Ok(())
    }

    async fn find(
        &self,
        run_id: &str,
        requirement_id: &str,
    ) -> StoreResult<Option<OutcomeRecord>> {
        let store = self.records.lock().unwrap();
        Ok(store
            .iter()
            .rev()
            .find(|r| r.run_id == run_id && r.requirement_id == requirement_id)
            .cloned())
    }

    async fn latest_for_requirement(
        &self,
        requirement_id: &str,
    ) -> StoreResult<Option<OutcomeRecord>> {
        let store = self.records.lock().unwrap();
        Ok(store
            .iter()
            .rev()
            .find(|r| r.requirement_id == requirement_id)
            .cloned())
    }

    async fn merge_remediation(
        &self,
        run_id: &str,
        requirement_id: &str,
        smart_task: &str,
        benchmark_answer: &str,
    ) -> StoreResult<()> {
        let mut store = self.records.lock().unwrap();
        let record = store
            .iter_mut()
            .rev()
            .find(|r| r.run_id == run_id && r.requirement_id == requirement_id)
            .ok_or_else(|| StoreError::OutcomeNotFound {
                run_id: run_id.to_string(),
                requirement_id: requirement_id.to_string(),
            })?;
        // Only the remediation fields move; citations stay untouched.
        record.smart_task = smart_task.to_string();
        record.benchmark_answer = benchmark_answer.to_string();
        Ok(())
    }

    async fn list_for_run(&self, run_id: &str) -> StoreResult<Vec<OutcomeRecord>> {
        let store = self.records.lock().unwrap();
        Ok(store
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }
}
