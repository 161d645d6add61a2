//! Vetmap Core Library
//!
//! Provider-agnostic validation pipeline for RTO compliance checking:
//! assessment documents and learner guides are validated against
//! structured unit-of-competency requirements, with remediation (SMART)
//! task generation for requirements that are not fully met.
//!
//! The pipeline runs two phases per requirement: Phase 1 validates the
//! requirement against the available document content and classifies the
//! verdict; Phase 2 generates a remediation task only when the verdict
//! leaves a gap. A batch always completes: individual failures surface
//! as failed outcomes, never as a lost requirement.

pub mod domain;
pub mod obs;
pub mod orchestrator;
pub mod prompt;
pub mod remediation;
pub mod resolver;
pub mod response;
pub mod telemetry;
pub mod validator;

pub use domain::{
    ComplianceStatus, RemediationTask, RequirementAssessment, Result, TypeSummary, UnitMeta,
    UnitReport, ValidationOutcome, VetmapError, NOT_APPLICABLE,
};

pub use orchestrator::{load_requirements, UnitValidator, ValidationOptions};
pub use remediation::{should_generate, RemediationGenerator};
pub use resolver::{ContentContext, ContentResolver, Grounding, SourceRef};
pub use response::{
    extract_json, parse_remediation_response, parse_validation_response, ParsedRemediation,
    ParsedValidation,
};
pub use validator::RequirementValidator;

pub use obs::{
    emit_remediation_generated, emit_remediation_skipped, emit_requirement_validated,
    emit_run_finished, emit_run_started, RunSpan,
};
pub use telemetry::{init_tracing, init_tracing_with, LogFormat};

pub use vetmap_providers::{
    build_client, dispatch_plan, DispatchPlan, OrchestrationMode, ProviderClient, ProviderId,
    ProviderKind, ProviderSettings,
};
pub use vetmap_store::{
    PromptPhase, PromptTemplate, Requirement, RequirementType, SourceDocument,
};

/// Vetmap version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
