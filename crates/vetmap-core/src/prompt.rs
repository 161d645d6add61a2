//! Prompt template resolution and rendering.
//!
//! Validation templates resolve through three tiers: the
//! (requirement type, document type) row, then the wildcard document-type
//! row, then a built-in minimal template, so the validator can never be left
//! without a usable prompt. Generation templates stop after the wildcard
//! tier; a missing Phase 2 template skips remediation instead.

use tracing::debug;

use vetmap_store::{
    PromptPhase, PromptTemplate, Requirement, StoreResult, TemplateStore,
};

use crate::domain::{UnitMeta, ValidationOutcome};

/// Fallback validation template used when the store has no row at all.
const BUILTIN_VALIDATION_TEMPLATE: &str = "\
You are auditing assessment materials for a Registered Training Organisation.

Determine whether the following requirement of unit {{unit_code}} ({{unit_title}}) \
is addressed by the supplied {{document_type}} content.

Requirement {{requirement_number}} ({{requirement_type}}):
{{requirement_text}}
{{element_section}}
Identify where the requirement is addressed, quote the mapped content, and \
describe anything the documents do not cover.";

/// Strict output-format instruction appended to every validation prompt.
///
/// States the expected keys and the N/A rule. This text is a hint to the
/// model; the rule itself is enforced post-parse in the validator.
const VALIDATION_OUTPUT_CONTRACT: &str = "\

Respond with a single JSON object and nothing else, using exactly these keys:
{
  \"status\": \"Met\" | \"Partially Met\" | \"Not Met\",
  \"reasoning\": \"why you reached this verdict\",
  \"mapped_content\": \"the document content addressing the requirement\",
  \"citations\": [\"document name and page, one entry per source\"],
  \"unmapped_content\": \"what the documents do not cover\"
}
When status is \"Met\", set unmapped_content to \"N/A\".";

/// Output-format instruction appended to every generation prompt.
const GENERATION_OUTPUT_CONTRACT: &str = "\

Respond with a single JSON object and nothing else, using exactly these keys:
{
  \"smart_task\": \"the assessment task or question\",
  \"benchmark_answer\": \"a complete satisfactory response\",
  \"rationale\": \"how the task closes the identified gap\"
}";

/// Resolve the Phase 1 template through the three-tier fallback ladder.
pub async fn resolve_validation_template(
    store: &dyn TemplateStore,
    requirement: &Requirement,
    document_type: Option<&str>,
) -> StoreResult<PromptTemplate> {
    if let Some(document_type) = document_type {
        if let Some(template) = store
            .find_template(
                PromptPhase::Validation,
                requirement.requirement_type,
                Some(document_type),
            )
            .await?
        {
            return Ok(template);
        }
    }
    if let Some(template) = store
        .find_template(PromptPhase::Validation, requirement.requirement_type, None)
        .await?
    {
        return Ok(template);
    }

    debug!(
        requirement_type = %requirement.requirement_type,
        "no stored validation template, using the built-in"
    );
    Ok(PromptTemplate {
        phase: PromptPhase::Validation,
        requirement_type: requirement.requirement_type,
        document_type: None,
        prompt_text: BUILTIN_VALIDATION_TEMPLATE.to_string(),
        system_instruction: None,
        output_schema: None,
        generation_config: None,
        active: true,
        is_default: true,
    })
}

/// Resolve the Phase 2 template: specific row, then wildcard, then none.
pub async fn resolve_generation_template(
    store: &dyn TemplateStore,
    requirement: &Requirement,
    document_type: Option<&str>,
) -> StoreResult<Option<PromptTemplate>> {
    if let Some(document_type) = document_type {
        if let Some(template) = store
            .find_template(
                PromptPhase::Generation,
                requirement.requirement_type,
                Some(document_type),
            )
            .await?
        {
            return Ok(Some(template));
        }
    }
    store
        .find_template(PromptPhase::Generation, requirement.requirement_type, None)
        .await
}

/// Substitute requirement and unit placeholders into a template body and
/// append the validation output contract.
pub fn render_validation_prompt(
    template: &PromptTemplate,
    requirement: &Requirement,
    unit: &UnitMeta,
) -> String {
    let mut prompt = substitute_common(&template.prompt_text, requirement, unit);
    prompt.push_str(VALIDATION_OUTPUT_CONTRACT);
    prompt
}

/// Substitute placeholders for a generation prompt, including the Phase 1
/// verdict the remediation must be grounded in, and append the generation
/// output contract.
pub fn render_generation_prompt(
    template: &PromptTemplate,
    requirement: &Requirement,
    unit: &UnitMeta,
    outcome: &ValidationOutcome,
) -> String {
    let mut prompt = substitute_common(&template.prompt_text, requirement, unit);
    prompt = prompt
        .replace("{{validation_status}}", outcome.status.as_str())
        .replace("{{validation_reasoning}}", &outcome.reasoning)
        .replace("{{unmapped_content}}", &outcome.unmapped_content);
    prompt.push_str(GENERATION_OUTPUT_CONTRACT);
    prompt
}

fn substitute_common(body: &str, requirement: &Requirement, unit: &UnitMeta) -> String {
    let element_section = match &requirement.element_text {
        Some(element) => format!("\nParent element:\n{element}\n"),
        None => String::new(),
    };
    body.replace("{{requirement_number}}", &requirement.number)
        .replace("{{requirement_text}}", &requirement.text)
        .replace(
            "{{requirement_type}}",
            requirement.requirement_type.label(),
        )
        .replace(
            "{{element_text}}",
            requirement.element_text.as_deref().unwrap_or(""),
        )
        .replace("{{element_section}}", &element_section)
        .replace("{{unit_code}}", &unit.unit_code)
        .replace("{{unit_title}}", &unit.unit_title)
        .replace(
            "{{document_type}}",
            unit.document_type.as_deref().unwrap_or("assessment"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetmap_store::fakes::MemoryTemplateStore;
    use vetmap_store::RequirementType;

    use crate::domain::ComplianceStatus;

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

    fn stored_template(document_type: Option<&str>, marker: &str) -> PromptTemplate {
        PromptTemplate {
            phase: PromptPhase::Validation,
            requirement_type: RequirementType::KnowledgeEvidence,
            document_type: document_type.map(|s| s.to_string()),
            prompt_text: format!("{marker}: validate {{{{requirement_number}}}}"),
            system_instruction: None,
            output_schema: None,
            generation_config: None,
            active: true,
            is_default: true,
        }
    }

    #[tokio::test]
    async fn test_specific_template_wins() {
        let store = MemoryTemplateStore::new();
        store.add(stored_template(Some("assessment"), "specific"));
        store.add(stored_template(None, "wildcard"));

        let template = resolve_validation_template(&store, &requirement(), Some("assessment"))
            .await
            .unwrap();
        assert!(template.prompt_text.starts_with("specific"));
    }

    #[tokio::test]
    async fn test_wildcard_fallback() {
        let store = MemoryTemplateStore::new();
        store.add(stored_template(None, "wildcard"));

        let template = resolve_validation_template(&store, &requirement(), Some("learner_guide"))
            .await
            .unwrap();
        assert!(template.prompt_text.starts_with("wildcard"));
    }

    #[tokio::test]
    async fn test_builtin_fallback_never_leaves_validator_without_prompt() {
        let store = MemoryTemplateStore::new();
        let template = resolve_validation_template(&store, &requirement(), Some("assessment"))
            .await
            .unwrap();
        assert!(template.prompt_text.contains("{{requirement_text}}"));
    }

    #[tokio::test]
    async fn test_generation_template_has_no_builtin_tier() {
        let store = MemoryTemplateStore::new();
        let template = resolve_generation_template(&store, &requirement(), Some("assessment"))
            .await
            .unwrap();
        assert!(template.is_none());
    }

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let template = resolve_builtin();
        let prompt = render_validation_prompt(&template, &requirement(), &unit());

        assert!(prompt.contains("KE1"));
        assert!(prompt.contains("WHS duties of employers and workers"));
        assert!(prompt.contains("BSBWHS411"));
        assert!(prompt.contains("Knowledge Evidence"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_render_appends_output_contract_with_na_rule() {
        let template = resolve_builtin();
        let prompt = render_validation_prompt(&template, &requirement(), &unit());
        assert!(prompt.contains("\"status\""));
        assert!(prompt.contains("\"unmapped_content\""));
        assert!(prompt.contains("set unmapped_content to \"N/A\""));
    }

    #[test]
    fn test_render_generation_includes_phase1_grounding() {
        let template = PromptTemplate {
            phase: PromptPhase::Generation,
            requirement_type: RequirementType::KnowledgeEvidence,
            document_type: None,
            prompt_text: "Gap: {{unmapped_content}} (was {{validation_status}})".to_string(),
            system_instruction: None,
            output_schema: None,
            generation_config: None,
            active: true,
            is_default: true,
        };
        let outcome = ValidationOutcome {
            requirement_id: "ke-1".to_string(),
            status: ComplianceStatus::PartiallyMet,
            reasoning: "partial coverage".to_string(),
            mapped_content: String::new(),
            citations: vec![],
            unmapped_content: "hazard reporting".to_string(),
            tooling_failure: false,
        };
        let prompt = render_generation_prompt(&template, &requirement(), &unit(), &outcome);
        assert!(prompt.contains("Gap: hazard reporting"));
        assert!(prompt.contains("was Partially Met"));
        assert!(prompt.contains("\"smart_task\""));
    }

    fn resolve_builtin() -> PromptTemplate {
        PromptTemplate {
            phase: PromptPhase::Validation,
            requirement_type: RequirementType::KnowledgeEvidence,
            document_type: None,
            prompt_text: BUILTIN_VALIDATION_TEMPLATE.to_string(),
            system_instruction: None,
            output_schema: None,
            generation_config: None,
            active: true,
            is_default: true,
        }
    }
}
