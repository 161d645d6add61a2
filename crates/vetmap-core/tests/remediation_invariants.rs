//! Invariants around remediation generation and the N/A sentinel.
//!
//! The satisfied-requirement rule is enforced in the pipeline, not trusted
//! to the model: a "Met" verdict always stores "N/A" remediation fields,
//! and Phase 2 runs exactly when the trigger predicate says so.

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
    OutcomeRecord, OutcomeRepository, PromptPhase, PromptTemplate, Requirement, RequirementType,
};

fn unit() -> UnitMeta {
    UnitMeta {
        unit_code: "BSBWHS411".to_string(),
        unit_title: "Implement and monitor WHS policies".to_string(),
        document_type: Some("assessment".to_string()),
    }
}

fn requirement(id: &str) -> Requirement {
    Requirement {
        id: id.to_string(),
        requirement_type: RequirementType::KnowledgeEvidence,
        number: "KE1".to_string(),
        text: "WHS duties of employers and workers".to_string(),
        element_text: None,
    }
}

fn generation_template() -> PromptTemplate {
    PromptTemplate {
        phase: PromptPhase::Generation,
        requirement_type: RequirementType::KnowledgeEvidence,
        document_type: None,
        prompt_text: "Close this gap: {{unmapped_content}}".to_string(),
        system_instruction: None,
        output_schema: None,
        generation_config: None,
        active: true,
        is_default: true,
    }
}

fn inline_context() -> ContentContext {
    ContentContext {
        grounding: Grounding::InlineText("Task 1 content".to_string()),
        sources: vec![],
    }
}

fn stored_outcome(run_id: &str, requirement_id: &str, smart_task: &str) -> OutcomeRecord {
    OutcomeRecord {
        run_id: run_id.to_string(),
        requirement_id: requirement_id.to_string(),
        status: "Partially Met".to_string(),
        reasoning: "reporting gap".to_string(),
        mapped_content: "Task 2".to_string(),
        citations: vec!["assessment.pdf p.5".to_string()],
        unmapped_content: "incident reporting".to_string(),
        smart_task: smart_task.to_string(),
        benchmark_answer: "old answer".to_string(),
        tooling_failure: false,
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn met_requirement_stores_na_even_when_model_emits_remediation() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    // The model ignores the instruction and emits remediation fields
    // alongside a met verdict.
    client.push_text(
        &json!({
            "status": "Met",
            "reasoning": "all covered",
            "mapped_content": "Task 1",
            "unmapped_content": "this should not survive",
            "smart_question": "A task the model should not have produced",
            "benchmark_answer": "An answer the model should not have produced",
        })
        .to_string(),
    );
    let templates = Arc::new(MemoryTemplateStore::new());
    templates.add(generation_template());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes.clone());

    let report = orchestrator
        .validate_unit(&unit(), &[requirement("ke-1")], &inline_context())
        .await
        .unwrap();

    let row = outcomes
        .find(&report.run_id, "ke-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "Met");
    assert_eq!(row.smart_task, NOT_APPLICABLE);
    assert_eq!(row.benchmark_answer, NOT_APPLICABLE);
    assert_eq!(row.unmapped_content, NOT_APPLICABLE);
    // Phase 2 never ran: one provider call only.
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn unmet_requirement_generates_exactly_once() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    client.push_text(
        &json!({
            "status": "Not Met",
            "reasoning": "no coverage",
            "unmapped_content": "everything",
        })
        .to_string(),
    );
    client.push_text(
        &json!({
            "smart_task": "Write an incident report from the scenario.",
            "benchmark_answer": "Covers notification and recording.",
        })
        .to_string(),
    );
    let templates = Arc::new(MemoryTemplateStore::new());
    templates.add(generation_template());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes);

    let report = orchestrator
        .validate_unit(&unit(), &[requirement("ke-1")], &inline_context())
        .await
        .unwrap();

    assert_eq!(
        report.assessments[0].outcome.status,
        ComplianceStatus::NotMet
    );
    assert!(report.assessments[0].remediation.is_some());
    // Exactly one validation call and one generation call.
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn existing_remediation_suppresses_regeneration_on_rerun() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    client.push_text(
        &json!({
            "status": "Partially Met",
            "reasoning": "still a gap",
            "unmapped_content": "incident reporting",
        })
        .to_string(),
    );
    let templates = Arc::new(MemoryTemplateStore::new());
    templates.add(generation_template());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    // A previous run already produced a real task for this requirement.
    outcomes
        .insert_many(&[stored_outcome(
            "run-0",
            "ke-1",
            "Describe the incident reporting procedure",
        )])
        .await
        .unwrap();

    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes);
    let report = orchestrator
        .validate_unit(&unit(), &[requirement("ke-1")], &inline_context())
        .await
        .unwrap();

    assert!(report.assessments[0].remediation.is_none());
    // Only the validation call; Phase 2 was suppressed.
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn placeholder_remediation_does_not_suppress_regeneration() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    client.push_text(
        &json!({
            "status": "Partially Met",
            "reasoning": "still a gap",
            "unmapped_content": "incident reporting",
        })
        .to_string(),
    );
    client.push_text(&json!({ "smart_task": "New task", "benchmark_answer": "A" }).to_string());
    let templates = Arc::new(MemoryTemplateStore::new());
    templates.add(generation_template());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    // The stored value is a placeholder; it must not block Phase 2.
    outcomes
        .insert_many(&[stored_outcome("run-0", "ke-1", "n/a")])
        .await
        .unwrap();

    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes);
    let report = orchestrator
        .validate_unit(&unit(), &[requirement("ke-1")], &inline_context())
        .await
        .unwrap();

    assert!(report.assessments[0].remediation.is_some());
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn refresh_option_overrides_existing_remediation() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    client.push_text(
        &json!({
            "status": "Partially Met",
            "reasoning": "still a gap",
            "unmapped_content": "incident reporting",
        })
        .to_string(),
    );
    client.push_text(
        &json!({ "smart_task": "Refreshed task", "benchmark_answer": "B" }).to_string(),
    );
    let templates = Arc::new(MemoryTemplateStore::new());
    templates.add(generation_template());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    outcomes
        .insert_many(&[stored_outcome("run-0", "ke-1", "A perfectly good old task")])
        .await
        .unwrap();

    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes)
        .with_options(ValidationOptions {
            refresh_remediation: true,
            cancel: None,
        });
    let report = orchestrator
        .validate_unit(&unit(), &[requirement("ke-1")], &inline_context())
        .await
        .unwrap();

    let task = report.assessments[0].remediation.as_ref().unwrap();
    assert_eq!(task.task, "Refreshed task");
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn refresh_remediation_for_merges_without_losing_citations() {
    let client = Arc::new(ScriptedClient::new(ProviderId::TextInjection));
    client.push_text(
        &json!({ "smart_task": "Targeted follow-up task", "benchmark_answer": "C" }).to_string(),
    );
    let templates = Arc::new(MemoryTemplateStore::new());
    templates.add(generation_template());
    let outcomes = Arc::new(MemoryOutcomeRepository::new());
    outcomes
        .insert_many(&[stored_outcome("run-7", "ke-1", "stale task")])
        .await
        .unwrap();

    let orchestrator = UnitValidator::new(client.clone(), templates, outcomes.clone());
    let task = orchestrator
        .refresh_remediation_for("run-7", &unit(), &requirement("ke-1"), &inline_context())
        .await
        .unwrap()
        .expect("a refreshed task");
    assert_eq!(task.task, "Targeted follow-up task");

    let row = outcomes.find("run-7", "ke-1").await.unwrap().unwrap();
    assert_eq!(row.smart_task, "Targeted follow-up task");
    // Citations stored by the original run survive the merge.
    assert_eq!(row.citations, vec!["assessment.pdf p.5".to_string()]);
    assert_eq!(row.reasoning, "reporting gap");
}
