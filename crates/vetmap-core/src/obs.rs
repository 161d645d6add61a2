//! Structured observability hooks for validation run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard
//! - Emission functions for key lifecycle events: run start, requirement
//!   verdicts, remediation decisions, run completion
//!
//! Events are emitted at `info!` level. For JSON output, initialise the
//! subscriber with `init_tracing(true, ...)`.

use tracing::info;

use crate::domain::ComplianceStatus;

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// validation run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("vetmap.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: unit validation started.
pub fn emit_run_started(run_id: &str, unit_code: &str, requirement_count: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        unit_code = %unit_code,
        requirement_count = requirement_count,
    );
}

/// Emit event: one requirement classified.
pub fn emit_requirement_validated(run_id: &str, requirement_number: &str, status: ComplianceStatus) {
    info!(
        event = "requirement.validated",
        run_id = %run_id,
        requirement = %requirement_number,
        status = %status,
    );
}

/// Emit event: remediation generated for a requirement.
pub fn emit_remediation_generated(run_id: &str, requirement_number: &str) {
    info!(
        event = "remediation.generated",
        run_id = %run_id,
        requirement = %requirement_number,
    );
}

/// Emit event: remediation skipped, with the reason.
pub fn emit_remediation_skipped(run_id: &str, requirement_number: &str, reason: &str) {
    info!(
        event = "remediation.skipped",
        run_id = %run_id,
        requirement = %requirement_number,
        reason = %reason,
    );
}

/// Emit event: unit validation finished with its aggregate verdict.
pub fn emit_run_finished(run_id: &str, overall: ComplianceStatus, duration_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        overall_status = %overall,
        duration_ms = duration_ms,
    );
}
