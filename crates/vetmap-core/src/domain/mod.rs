//! Domain model for the validation pipeline.

mod error;
mod outcome;
mod status;

pub use error::{Result, VetmapError};
pub use outcome::{
    bound_reasoning, RemediationTask, RequirementAssessment, TypeSummary, UnitMeta, UnitReport,
    ValidationOutcome, MAX_REASONING_LEN, NOT_APPLICABLE,
};
pub use status::ComplianceStatus;
