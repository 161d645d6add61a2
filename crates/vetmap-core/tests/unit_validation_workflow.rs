//! End-to-end unit validation against scripted provider responses.
//!
//! Three requirements: one met, one partially met with a gap, one whose
//! model response is truncated JSON. All three must appear in the report,
//! the batch must aggregate to "Partially Met", and the failed requirement
//! must carry a "Validation failed: ..." reasoning instead of aborting the
//! run.

use std::sync::Arc;

use serde_json::json;
use vetmap_core::{
    ComplianceStatus, ContentContext, Grounding, UnitMeta, UnitValidator, ValidationOptions,
    NOT_APPLICABLE,
};
use vetmap_providers::fakes::ScriptedClient;
use vetmap_providers::ProviderId;
use vetmap_store::fakes::{MemoryOutcomeRepository, MemoryTemplateStore};
use vetmap_store::{
    OutcomeRepository, PromptPhase, PromptTemplate, Requirement, RequirementType,
};

fn unit() -> UnitMeta {
    UnitMeta {
        unit_code: "BSBWHS411".to_string(),
        unit_title: "Implement and monitor WHS policies".to_string(),
        document_type: Some("assessment".to_string()),
    }
}

fn requirement(id: &str, number: &str, requirement_type: RequirementType) -> Requirement {
    Requirement {
        id: id.to_string(),
        requirement_type,
        number: number.to_string(),
        text: format!("Requirement text for {number}"),
        element_text: None,
    }
}

fn generation_template(requirement_type: RequirementType) -> PromptTemplate {
    PromptTemplate {
        phase: PromptPhase::Generation,
        requirement_type,
        document_type: None,
        prompt_text: "Write a SMART task closing this gap: {{unmapped_content}}".to_string(),
        system_instruction: None,
        output_schema: None,
        generation_config: None,
        active: true,
        is_default: true,
    }
}

fn inline_context() -> ContentContext {
    ContentContext {
        grounding: Grounding::InlineText("Task 1: outline WHS duties.".to_string()),
        sources: vec![],
    }
}

#[tokio::test]
async fn three_requirement_batch_completes_with_partial_overall() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    // A: met.
    client.push_text(
        &json!({
            "status": "Met",
            "reasoning": "fully addressed in task 1",
            "mapped_content": "Task 1",
            "citations": ["assessment.pdf p.2"],
            "unmapped_content": "N/A",
        })
        .to_string(),
    );
    // B: partially met, with a gap description.
    client.push_text(
        &json!({
            "status": "Partially Met",
            "reasoning": "duties covered, reporting missing",
            "mapped_content": "Task 2",
            "citations": ["assessment.pdf p.5"],
            "unmapped_content": "incident reporting process not assessed",
        })
        .to_string(),
    );
    // B: remediation for the gap.
    client.push_text(
        &json!({
            "smart_task": "Describe the incident reporting process step by step.",
            "benchmark_answer": "Identifies notification, recording and review steps.",
        })
        .to_string(),
    );
    // C: truncated JSON.
    client.push_text(r#"{"status": "met", "reasoning": "incomplete"#);

    let templates = Arc::new(MemoryTemplateStore::new());
    // Only B's requirement type has a generation template; C's Phase 2
    // soft-skips without a provider call.
    templates.add(generation_template(RequirementType::PerformanceEvidence));

    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes.clone());

    let requirements = vec![
        requirement("req-a", "KE1", RequirementType::KnowledgeEvidence),
        requirement("req-b", "PE1", RequirementType::PerformanceEvidence),
        requirement("req-c", "FS1", RequirementType::FoundationSkill),
    ];

    let report = orchestrator
        .validate_unit(&unit(), &requirements, &inline_context())
        .await
        .expect("batch must complete");

    // No requirement silently vanishes.
    assert_eq!(report.assessments.len(), 3);
    assert_eq!(report.overall_status, ComplianceStatus::PartiallyMet);

    let a = &report.assessments[0];
    assert_eq!(a.outcome.status, ComplianceStatus::Met);
    assert!(a.remediation.is_none());
    assert!(!a.outcome.tooling_failure);

    let b = &report.assessments[1];
    assert_eq!(b.outcome.status, ComplianceStatus::PartiallyMet);
    let b_task = b.remediation.as_ref().expect("B gets a remediation task");
    assert!(b_task.task.contains("incident reporting"));

    let c = &report.assessments[2];
    assert_eq!(c.outcome.status, ComplianceStatus::NotMet);
    assert!(c.outcome.reasoning.starts_with("Validation failed: "));
    assert!(c.outcome.tooling_failure);
    assert!(c.remediation.is_none());

    // 3 validation calls + 1 remediation call; C's parse failure is not
    // retried and its remediation skips on the missing template.
    assert_eq!(client.call_count(), 4);

    // Per-type breakdown.
    let ke = &report.summary_by_type[&RequirementType::KnowledgeEvidence];
    assert_eq!((ke.met, ke.partially_met, ke.not_met), (1, 0, 0));
    let fs = &report.summary_by_type[&RequirementType::FoundationSkill];
    assert_eq!((fs.met, fs.partially_met, fs.not_met), (0, 0, 1));

    // All three rows persisted under the run id.
    let rows = outcomes.list_for_run(&report.run_id).await.unwrap();
    assert_eq!(rows.len(), 3);
    let a_row = rows.iter().find(|r| r.requirement_id == "req-a").unwrap();
    assert_eq!(a_row.status, "Met");
    assert_eq!(a_row.smart_task, NOT_APPLICABLE);
    assert_eq!(a_row.benchmark_answer, NOT_APPLICABLE);
    let b_row = rows.iter().find(|r| r.requirement_id == "req-b").unwrap();
    assert!(b_row.smart_task.contains("incident reporting"));
}

#[tokio::test]
async fn cancellation_between_requirements_stops_the_run() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    client.push_text(&json!({ "status": "Met", "reasoning": "ok" }).to_string());

    let templates = Arc::new(MemoryTemplateStore::new());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());

    let (tx, rx) = tokio::sync::watch::channel(true);
    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes)
        .with_options(ValidationOptions {
            refresh_remediation: false,
            cancel: Some(rx),
        });
    drop(tx);

    let requirements = vec![requirement(
        "req-a",
        "KE1",
        RequirementType::KnowledgeEvidence,
    )];
    let err = orchestrator
        .validate_unit(&unit(), &requirements, &inline_context())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cancelled"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn empty_context_batch_still_returns_every_requirement() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    let templates = Arc::new(MemoryTemplateStore::new());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes);

    let requirements = vec![
        requirement("req-a", "KE1", RequirementType::KnowledgeEvidence),
        requirement("req-b", "KE2", RequirementType::KnowledgeEvidence),
    ];
    let report = orchestrator
        .validate_unit(&unit(), &requirements, &ContentContext::empty())
        .await
        .unwrap();

    assert_eq!(report.assessments.len(), 2);
    assert_eq!(report.overall_status, ComplianceStatus::NotMet);
    for assessment in &report.assessments {
        assert!(assessment.outcome.reasoning.contains("no document content"));
        assert!(assessment.outcome.tooling_failure);
    }
    // The provider is never consulted without content.
    assert_eq!(client.call_count(), 0);
}
