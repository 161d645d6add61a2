//! Phase 2: remediation (SMART) task generation.
//!
//! Runs only when Phase 1 left a gap, and only when no usable remediation
//! already exists for the requirement. Every failure path returns `None`
//! so the batch proceeds with an empty remediation for that requirement.

use tracing::{debug, warn};

use vetmap_providers::{GenerationRequest, ProviderClient};
use vetmap_store::{Requirement, TemplateStore};

use crate::domain::{ComplianceStatus, RemediationTask, UnitMeta, ValidationOutcome};
use crate::prompt::{render_generation_prompt, resolve_generation_template};
use crate::resolver::{ContentContext, Grounding};
use crate::response::parse_remediation_response;

/// Values that count as "no remediation present" when deciding whether to
/// regenerate, compared case-insensitively.
const PLACEHOLDER_VALUES: &[&str] = &["", "n/a", "none", "null"];

/// Whether Phase 2 should run for a requirement.
///
/// True unless the requirement is fully met, or a non-placeholder
/// remediation already exists (re-runs keep their existing task rather
/// than regenerating it).
pub fn should_generate(status: ComplianceStatus, existing: Option<&str>) -> bool {
    if !status.needs_remediation() {
        return false;
    }
    match existing {
        Some(existing) => is_placeholder(existing),
        None => true,
    }
}

/// Whether a stored remediation value is a placeholder.
pub fn is_placeholder(value: &str) -> bool {
    let folded = value.trim().to_ascii_lowercase();
    PLACEHOLDER_VALUES.contains(&folded.as_str())
}

/// Phase 2 generator.
pub struct RemediationGenerator<'a> {
    client: &'a dyn ProviderClient,
    templates: &'a dyn TemplateStore,
}

impl<'a> RemediationGenerator<'a> {
    pub fn new(client: &'a dyn ProviderClient, templates: &'a dyn TemplateStore) -> Self {
        Self { client, templates }
    }

    /// Generate a remediation task grounded in the Phase 1 outcome.
    ///
    /// Returns `None` when no generation template exists for the
    /// requirement type (soft fail, unlike Phase 1's built-in fallback),
    /// when the provider call fails, or when the response cannot be
    /// parsed.
    pub async fn generate(
        &self,
        requirement: &Requirement,
        context: &ContentContext,
        outcome: &ValidationOutcome,
        unit: &UnitMeta,
    ) -> Option<RemediationTask> {
        let template = match resolve_generation_template(
            self.templates,
            requirement,
            unit.document_type.as_deref(),
        )
        .await
        {
            Ok(Some(template)) => template,
            Ok(None) => {
                debug!(
                    requirement = %requirement.number,
                    "no generation template, skipping remediation"
                );
                return None;
            }
            Err(e) => {
                warn!(requirement = %requirement.number, error = %e, "template lookup failed");
                return None;
            }
        };

        let prompt = render_generation_prompt(&template, requirement, unit, outcome);
        let request = GenerationRequest {
            prompt,
            system_instruction: template.system_instruction.clone(),
            search_store: match &context.grounding {
                Grounding::SearchStore(store) => Some(store.clone()),
                _ => None,
            },
            document_text: match &context.grounding {
                Grounding::InlineText(text) => Some(text.clone()),
                _ => None,
            },
            output_schema: template.output_schema.clone(),
            generation_config: template.generation_config.clone(),
        };

        let response = match self.client.generate_validation(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(requirement = %requirement.number, error = %e, "remediation call failed");
                return None;
            }
        };

        let Some(parsed) = parse_remediation_response(&response.text) else {
            warn!(requirement = %requirement.number, "unparseable remediation response");
            return None;
        };

        let task = parsed.task.filter(|t| !is_placeholder(t))?;
        Some(RemediationTask {
            task,
            benchmark_answer: parsed
                .benchmark_answer
                .filter(|a| !is_placeholder(a))
                .unwrap_or_default(),
            rationale: parsed.rationale.filter(|r| !is_placeholder(r)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vetmap_providers::fakes::ScriptedClient;
    use vetmap_providers::ProviderId;
    use vetmap_store::fakes::MemoryTemplateStore;
    use vetmap_store::{PromptPhase, PromptTemplate, RequirementType};

    fn requirement() -> Requirement {
        Requirement {
            id: "ke-1".to_string(),
            requirement_type: RequirementType::KnowledgeEvidence,
            number: "KE1".to_string(),
            text: "WHS duties of employers and workers".to_string(),
            element_text: None,
        }
    }

    fn unit() -> UnitMeta {
        UnitMeta {
            unit_code: "BSBWHS411".to_string(),
            unit_title: "Implement WHS policies".to_string(),
            document_type: Some("assessment".to_string()),
        }
    }

    fn partial_outcome() -> ValidationOutcome {
        ValidationOutcome {
            requirement_id: "ke-1".to_string(),
            status: ComplianceStatus::PartiallyMet,
            reasoning: "covers duties but not reporting".to_string(),
            mapped_content: "Task 1".to_string(),
            citations: vec![],
            unmapped_content: "hazard reporting".to_string(),
            tooling_failure: false,
        }
    }

    fn context() -> ContentContext {
        ContentContext {
            grounding: Grounding::InlineText("document text".to_string()),
            sources: vec![],
        }
    }

    fn generation_template() -> PromptTemplate {
        PromptTemplate {
            phase: PromptPhase::Generation,
            requirement_type: RequirementType::KnowledgeEvidence,
            document_type: None,
            prompt_text:
                "Write a task closing this gap: {{unmapped_content}} ({{validation_reasoning}})"
                    .to_string(),
            system_instruction: None,
            output_schema: None,
            generation_config: None,
            active: true,
            is_default: true,
        }
    }

    #[test]
    fn test_should_generate_predicate() {
        // Met never generates, regardless of what exists.
        assert!(!should_generate(ComplianceStatus::Met, None));
        assert!(!should_generate(ComplianceStatus::Met, Some("old task")));

        // Unmet with no existing remediation generates.
        assert!(should_generate(ComplianceStatus::PartiallyMet, None));
        assert!(should_generate(ComplianceStatus::NotMet, None));

        // Placeholder values do not count as existing remediation.
        assert!(should_generate(ComplianceStatus::NotMet, Some("")));
        assert!(should_generate(ComplianceStatus::NotMet, Some("N/A")));
        assert!(should_generate(ComplianceStatus::NotMet, Some("n/a")));
        assert!(should_generate(ComplianceStatus::NotMet, Some("None")));
        assert!(should_generate(ComplianceStatus::NotMet, Some("null")));

        // A real existing task suppresses regeneration.
        assert!(!should_generate(
            ComplianceStatus::PartiallyMet,
            Some("Describe the reporting procedure")
        ));
    }

    #[tokio::test]
    async fn test_generates_task_grounded_in_phase1_gap() {
        let client = ScriptedClient::new(ProviderId::TextInjection);
        client.push_text(
            &json!({
                "smart_task": "Describe the hazard reporting procedure.",
                "benchmark_answer": "Names the WHS officer and the register.",
                "rationale": "targets the reporting gap",
            })
            .to_string(),
        );
        let templates = MemoryTemplateStore::new();
        templates.add(generation_template());
        let generator = RemediationGenerator::new(&client, &templates);

        let task = generator
            .generate(&requirement(), &context(), &partial_outcome(), &unit())
            .await
            .unwrap();
        assert_eq!(task.task, "Describe the hazard reporting procedure.");
        assert_eq!(task.benchmark_answer, "Names the WHS officer and the register.");
        assert!(task.rationale.is_some());

        // The prompt names the actual gap, not a generic ask.
        let requests = client.requests();
        assert!(requests[0].prompt.contains("hazard reporting"));
        assert!(requests[0].prompt.contains("covers duties but not reporting"));
    }

    #[tokio::test]
    async fn test_missing_template_skips_without_provider_call() {
        let client = ScriptedClient::new(ProviderId::TextInjection);
        let templates = MemoryTemplateStore::new();
        let generator = RemediationGenerator::new(&client, &templates);

        let task = generator
            .generate(&requirement(), &context(), &partial_outcome(), &unit())
            .await;
        assert!(task.is_none());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_parse_failure_returns_none() {
        let client = ScriptedClient::new(ProviderId::TextInjection);
        client.push_text("Sure, here is a task for you!");
        let templates = MemoryTemplateStore::new();
        templates.add(generation_template());
        let generator = RemediationGenerator::new(&client, &templates);

        let task = generator
            .generate(&requirement(), &context(), &partial_outcome(), &unit())
            .await;
        assert!(task.is_none());
    }

    #[tokio::test]
    async fn test_placeholder_task_in_response_returns_none() {
        let client = ScriptedClient::new(ProviderId::TextInjection);
        client.push_text(&json!({ "smart_task": "N/A", "benchmark_answer": "N/A" }).to_string());
        let templates = MemoryTemplateStore::new();
        templates.add(generation_template());
        let generator = RemediationGenerator::new(&client, &templates);

        let task = generator
            .generate(&requirement(), &context(), &partial_outcome(), &unit())
            .await;
        assert!(task.is_none());
    }
}
