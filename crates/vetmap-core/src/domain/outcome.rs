//! Result records for the two-phase validation workflow.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vetmap_store::{OutcomeRecord, RequirementType};

use super::status::ComplianceStatus;

/// Sentinel written into remediation fields when a requirement is fully met.
pub const NOT_APPLICABLE: &str = "N/A";

/// Reasoning text is bounded; model output beyond this is truncated.
pub const MAX_REASONING_LEN: usize = 2000;

/// Metadata for the unit of competency being validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMeta {
    /// Unit code (e.g. "BSBWHS411").
    pub unit_code: String,
    /// Unit title.
    pub unit_title: String,
    /// Category of the document set under validation.
    pub document_type: Option<String>,
}

/// Phase 1 result for one requirement.
///
/// Created once per requirement per validation run; replaced wholesale by
/// an explicit re-validation, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub requirement_id: String,
    pub status: ComplianceStatus,
    pub reasoning: String,
    pub mapped_content: String,
    pub citations: Vec<String>,
    pub unmapped_content: String,
    /// True when the verdict reflects a tooling failure (parse error,
    /// transport error, missing content) rather than a judgement about
    /// the documents. Such outcomes always carry a reasoning string
    /// beginning "Validation failed: ".
    pub tooling_failure: bool,
}

impl ValidationOutcome {
    /// Terminal failure outcome: classification is `NotMet`, the cause is
    /// recorded in the reasoning, and the tooling-failure flag is set so
    /// consumers can tell this apart from a genuine gap.
    pub fn failed(requirement_id: &str, cause: &str) -> Self {
        ValidationOutcome {
            requirement_id: requirement_id.to_string(),
            status: ComplianceStatus::NotMet,
            reasoning: format!("Validation failed: {cause}"),
            mapped_content: String::new(),
            citations: Vec::new(),
            unmapped_content: String::new(),
            tooling_failure: true,
        }
    }

    /// Enforce the satisfied-requirement invariant: a fully met requirement
    /// carries no gap description. Applied post-parse regardless of what
    /// the model produced; the prompt instruction stating the same rule is
    /// a hint, not a contract.
    pub fn enforce_na_invariant(mut self) -> Self {
        if self.status == ComplianceStatus::Met {
            self.unmapped_content = NOT_APPLICABLE.to_string();
        }
        self
    }
}

/// Phase 2 result: a remediation (SMART) task closing the gap Phase 1
/// found. Absent when the requirement is fully met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationTask {
    /// The task or question text.
    pub task: String,
    /// A benchmark answer a satisfactory response is judged against.
    pub benchmark_answer: String,
    /// Structured rationale, when the template asks for one.
    pub rationale: Option<String>,
}

/// Combined Phase 1 + Phase 2 result for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementAssessment {
    pub requirement_id: String,
    pub requirement_number: String,
    pub requirement_type: RequirementType,
    pub outcome: ValidationOutcome,
    pub remediation: Option<RemediationTask>,
}

impl RequirementAssessment {
    /// Flatten into the canonical persisted row. Remediation fields hold
    /// the "N/A" sentinel when the requirement is fully met.
    pub fn to_record(&self, run_id: &str) -> OutcomeRecord {
        let (smart_task, benchmark_answer) = match (&self.remediation, self.outcome.status) {
            (Some(task), _) => (task.task.clone(), task.benchmark_answer.clone()),
            (None, ComplianceStatus::Met) => {
                (NOT_APPLICABLE.to_string(), NOT_APPLICABLE.to_string())
            }
            (None, _) => (String::new(), String::new()),
        };
        OutcomeRecord {
            run_id: run_id.to_string(),
            requirement_id: self.requirement_id.clone(),
            status: self.outcome.status.as_str().to_string(),
            reasoning: self.outcome.reasoning.clone(),
            mapped_content: self.outcome.mapped_content.clone(),
            citations: self.outcome.citations.clone(),
            unmapped_content: self.outcome.unmapped_content.clone(),
            smart_task,
            benchmark_answer,
            tooling_failure: self.outcome.tooling_failure,
            created_at: Utc::now(),
        }
    }
}

/// Verdict counts for one requirement type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub met: usize,
    pub partially_met: usize,
    pub not_met: usize,
}

impl TypeSummary {
    pub fn record(&mut self, status: ComplianceStatus) {
        match status {
            ComplianceStatus::Met => self.met += 1,
            ComplianceStatus::PartiallyMet => self.partially_met += 1,
            ComplianceStatus::NotMet => self.not_met += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.met + self.partially_met + self.not_met
    }
}

/// Result of a complete unit validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Identifier of this validation run.
    pub run_id: String,
    pub unit_code: String,
    /// Aggregate verdict: `Met` only when every requirement is met;
    /// `PartiallyMet` when at least one requirement is met or partially
    /// met; `NotMet` otherwise.
    pub overall_status: ComplianceStatus,
    /// One entry per requirement, in iteration order. Never sparse: a
    /// requirement whose validation failed still appears, as a failed
    /// outcome.
    pub assessments: Vec<RequirementAssessment>,
    /// Verdict counts per requirement type.
    pub summary_by_type: HashMap<RequirementType, TypeSummary>,
}

impl UnitReport {
    /// Aggregate an overall verdict from per-requirement statuses.
    pub fn aggregate_status(assessments: &[RequirementAssessment]) -> ComplianceStatus {
        if assessments.is_empty() {
            return ComplianceStatus::NotMet;
        }
        if assessments
            .iter()
            .all(|a| a.outcome.status == ComplianceStatus::Met)
        {
            return ComplianceStatus::Met;
        }
        if assessments
            .iter()
            .any(|a| a.outcome.status != ComplianceStatus::NotMet)
        {
            return ComplianceStatus::PartiallyMet;
        }
        ComplianceStatus::NotMet
    }
}

/// Truncate reasoning text to the configured bound, on a char boundary.
pub fn bound_reasoning(reasoning: &str) -> String {
    if reasoning.len() <= MAX_REASONING_LEN {
        return reasoning.to_string();
    }
    let mut end = MAX_REASONING_LEN;
    while !reasoning.is_char_boundary(end) {
        end -= 1;
    }
    reasoning[..end].to_string()
}
