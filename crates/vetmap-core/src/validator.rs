//! Phase 1: requirement validation.
//!
//! One requirement moves through prompt resolution, a provider call,
//! response parsing, and status classification. Every failure along the
//! way collapses into a terminal `NotMet` outcome carrying a
//! "Validation failed: ..." reasoning string. A batch must keep the
//! partial results of its other requirements, so nothing here raises.

use tracing::warn;

use vetmap_providers::{GenerationRequest, ProviderClient};
use vetmap_store::{Requirement, TemplateStore};

use crate::domain::{bound_reasoning, ComplianceStatus, UnitMeta, ValidationOutcome};
use crate::prompt::{render_validation_prompt, resolve_validation_template};
use crate::resolver::{ContentContext, Grounding};
use crate::response::parse_validation_response;

/// Phase 1 validator.
pub struct RequirementValidator<'a> {
    client: &'a dyn ProviderClient,
    templates: &'a dyn TemplateStore,
}

impl<'a> RequirementValidator<'a> {
    pub fn new(client: &'a dyn ProviderClient, templates: &'a dyn TemplateStore) -> Self {
        Self { client, templates }
    }

    /// Validate one requirement against the given content context.
    ///
    /// Infallible by design: configuration, transport, and parse failures
    /// all become failed outcomes for this requirement alone.
    pub async fn validate(
        &self,
        requirement: &Requirement,
        context: &ContentContext,
        unit: &UnitMeta,
    ) -> ValidationOutcome {
        // An empty context is an automatic unsatisfied result; there is
        // nothing to send to the model.
        if context.is_empty() {
            return ValidationOutcome::failed(
                &requirement.id,
                "no document content available for validation",
            );
        }

        let template = match resolve_validation_template(
            self.templates,
            requirement,
            unit.document_type.as_deref(),
        )
        .await
        {
            Ok(template) => template,
            Err(e) => {
                warn!(requirement = %requirement.number, error = %e, "template lookup failed");
                return ValidationOutcome::failed(
                    &requirement.id,
                    &format!("template lookup error: {e}"),
                );
            }
        };

        let prompt = render_validation_prompt(&template, requirement, unit);
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
                warn!(requirement = %requirement.number, error = %e, "provider call failed");
                return ValidationOutcome::failed(&requirement.id, &e.to_string());
            }
        };

        // A response that yields no JSON is terminal for this requirement;
        // no retry.
        let Some(parsed) = parse_validation_response(&response.text) else {
            warn!(requirement = %requirement.number, "unparseable model response");
            return ValidationOutcome::failed(&requirement.id, "unparseable model response");
        };

        let status = match parsed.status.as_deref() {
            Some(raw) => ComplianceStatus::classify(raw),
            None => {
                warn!(requirement = %requirement.number, "response missing status field");
                return ValidationOutcome::failed(&requirement.id, "response missing status field");
            }
        };

        // Grounded providers report the documents they retrieved; use them
        // when the model response itself cites nothing.
        let citations = if parsed.citations.is_empty() {
            response.citations
        } else {
            parsed.citations
        };

        ValidationOutcome {
            requirement_id: requirement.id.clone(),
            status,
            reasoning: bound_reasoning(parsed.reasoning.as_deref().unwrap_or("")),
            mapped_content: parsed.mapped_content.unwrap_or_default(),
            citations,
            unmapped_content: parsed.unmapped_content.unwrap_or_default(),
            tooling_failure: false,
        }
        .enforce_na_invariant()
    }
}
