//! Batch orchestration: validate every requirement of a unit.
//!
//! Requirements are processed sequentially in caller-supplied order; each
//! one runs Phase 1 to completion, then conditionally Phase 2, before the
//! next begins. A single requirement's failure is recorded as that
//! requirement's outcome and iteration continues; the batch always
//! returns a result for every requirement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use uuid::Uuid;

use vetmap_providers::ProviderClient;
use vetmap_store::{
    OutcomeRepository, Requirement, RequirementStore, RequirementType, TemplateStore,
};

use crate::domain::{
    RemediationTask, RequirementAssessment, Result, TypeSummary, UnitMeta, UnitReport,
    ValidationOutcome, VetmapError,
};
use crate::obs::{
    emit_remediation_generated, emit_remediation_skipped, emit_requirement_validated,
    emit_run_finished, emit_run_started,
};
use crate::remediation::{should_generate, RemediationGenerator};
use crate::resolver::ContentContext;
use crate::validator::RequirementValidator;

/// Options governing one validation run.
#[derive(Clone, Default)]
pub struct ValidationOptions {
    /// Regenerate remediation even when a stored non-placeholder task
    /// exists. Set this when the source documents changed since the last
    /// run.
    pub refresh_remediation: bool,

    /// Cancellation signal checked between requirements. Requirements
    /// already completed keep their outcomes; the run returns
    /// `VetmapError::Cancelled`.
    pub cancel: Option<watch::Receiver<bool>>,
}

/// Batch/unit orchestrator.
pub struct UnitValidator {
    client: Arc<dyn ProviderClient>,
    templates: Arc<dyn TemplateStore>,
    outcomes: Arc<dyn OutcomeRepository>,
    options: ValidationOptions,
}

impl UnitValidator {
    pub fn new(
        client: Arc<dyn ProviderClient>,
        templates: Arc<dyn TemplateStore>,
        outcomes: Arc<dyn OutcomeRepository>,
    ) -> Self {
        Self {
            client,
            templates,
            outcomes,
            options: ValidationOptions::default(),
        }
    }

    /// Set run options.
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate every requirement of a unit against the given content
    /// context, persist the outcomes, and return the aggregate report.
    pub async fn validate_unit(
        &self,
        unit: &UnitMeta,
        requirements: &[Requirement],
        context: &ContentContext,
    ) -> Result<UnitReport> {
        let run_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        emit_run_started(&run_id, &unit.unit_code, requirements.len());

        let validator = RequirementValidator::new(self.client.as_ref(), self.templates.as_ref());
        let generator = RemediationGenerator::new(self.client.as_ref(), self.templates.as_ref());

        let mut assessments = Vec::with_capacity(requirements.len());
        let mut summary_by_type: HashMap<RequirementType, TypeSummary> = HashMap::new();

        for requirement in requirements {
            if let Some(cancel) = &self.options.cancel {
                if *cancel.borrow() {
                    return Err(VetmapError::Cancelled {
                        completed: assessments.len(),
                    });
                }
            }

            let outcome = validator.validate(requirement, context, unit).await;
            emit_requirement_validated(&run_id, &requirement.number, outcome.status);

            let remediation = self
                .maybe_generate_remediation(&run_id, requirement, context, &outcome, unit, &generator)
                .await;

            summary_by_type
                .entry(requirement.requirement_type)
                .or_default()
                .record(outcome.status);
            assessments.push(RequirementAssessment {
                requirement_id: requirement.id.clone(),
                requirement_number: requirement.number.clone(),
                requirement_type: requirement.requirement_type,
                outcome,
                remediation,
            });
        }

        let records: Vec<_> = assessments.iter().map(|a| a.to_record(&run_id)).collect();
        self.outcomes.insert_many(&records).await?;

        let overall_status = UnitReport::aggregate_status(&assessments);
        emit_run_finished(
            &run_id,
            overall_status,
            start.elapsed().as_millis() as u64,
        );

        Ok(UnitReport {
            run_id,
            unit_code: unit.unit_code.clone(),
            overall_status,
            assessments,
            summary_by_type,
        })
    }

    /// Phase 2 with its trigger predicate: skipped for met requirements
    /// and for requirements whose latest stored remediation is not a
    /// placeholder (unless the run forces a refresh).
    async fn maybe_generate_remediation(
        &self,
        run_id: &str,
        requirement: &Requirement,
        context: &ContentContext,
        outcome: &ValidationOutcome,
        unit: &UnitMeta,
        generator: &RemediationGenerator<'_>,
    ) -> Option<RemediationTask> {
        if !outcome.status.needs_remediation() {
            emit_remediation_skipped(run_id, &requirement.number, "requirement met");
            return None;
        }

        let existing = if self.options.refresh_remediation {
            None
        } else {
            self.outcomes
                .latest_for_requirement(&requirement.id)
                .await
                .ok()
                .flatten()
                .map(|record| record.smart_task)
        };
        if !should_generate(outcome.status, existing.as_deref()) {
            emit_remediation_skipped(run_id, &requirement.number, "existing remediation kept");
            return None;
        }

        let task = generator.generate(requirement, context, outcome, unit).await;
        match &task {
            Some(_) => emit_remediation_generated(run_id, &requirement.number),
            None => emit_remediation_skipped(run_id, &requirement.number, "no task produced"),
        }
        task
    }

    /// Regenerate one requirement's remediation and merge it into the
    /// stored outcome row, preserving the citations already there.
    pub async fn refresh_remediation_for(
        &self,
        run_id: &str,
        unit: &UnitMeta,
        requirement: &Requirement,
        context: &ContentContext,
    ) -> Result<Option<RemediationTask>> {
        let record = self
            .outcomes
            .find(run_id, &requirement.id)
            .await?
            .ok_or_else(|| {
                VetmapError::Store(vetmap_store::StoreError::OutcomeNotFound {
                    run_id: run_id.to_string(),
                    requirement_id: requirement.id.clone(),
                })
            })?;

        // Rebuild the Phase 1 view the generation prompt grounds in.
        let outcome = ValidationOutcome {
            requirement_id: record.requirement_id.clone(),
            status: crate::domain::ComplianceStatus::classify(&record.status),
            reasoning: record.reasoning.clone(),
            mapped_content: record.mapped_content.clone(),
            citations: record.citations.clone(),
            unmapped_content: record.unmapped_content.clone(),
            tooling_failure: record.tooling_failure,
        };
        if !outcome.status.needs_remediation() {
            return Ok(None);
        }

        let generator = RemediationGenerator::new(self.client.as_ref(), self.templates.as_ref());
        let Some(task) = generator.generate(requirement, context, &outcome, unit).await else {
            return Ok(None);
        };

        self.outcomes
            .merge_remediation(run_id, &requirement.id, &task.task, &task.benchmark_answer)
            .await?;
        Ok(Some(task))
    }
}

/// Fetch every requirement of a unit, one type at a time, in the stable
/// `RequirementType::ALL` order.
pub async fn load_requirements(
    store: &dyn RequirementStore,
    unit_code: &str,
) -> Result<Vec<Requirement>> {
    let mut requirements = Vec::new();
    for requirement_type in RequirementType::ALL {
        requirements.extend(
            store
                .requirements_for_unit(unit_code, requirement_type)
                .await?,
        );
    }
    Ok(requirements)
}
