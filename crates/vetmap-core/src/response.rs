//! Model response parsing and normalization.
//!
//! Models return JSON wrapped in markdown fences, embedded in prose, or,
//! on a bad day, truncated mid-string. [`extract_json`] recovers the
//! object where possible and returns `None` otherwise; it never panics and
//! never raises. Field access goes through explicit per-field alias
//! whitelists resolved in priority order, so the set of accepted spellings
//! is bounded and testable rather than emergent.

use serde_json::Value;

/// Accepted spellings for the status field, in priority order.
const STATUS_ALIASES: &[&str] = &["status", "validation_status", "result", "outcome"];

/// Accepted spellings for the reasoning field.
const REASONING_ALIASES: &[&str] = &["reasoning", "rationale", "justification", "explanation"];

/// Accepted spellings for mapped evidence.
const MAPPED_ALIASES: &[&str] = &[
    "mapped_content",
    "mapped_questions",
    "mapped_evidence",
    "evidence_found",
    "evidence",
];

/// Accepted spellings for the citation list.
const CITATION_ALIASES: &[&str] = &["citations", "citation", "references", "sources"];

/// Accepted spellings for the gap description.
const UNMAPPED_ALIASES: &[&str] = &[
    "unmapped_content",
    "gap_analysis",
    "gaps",
    "missing_content",
    "unmapped",
];

/// Accepted spellings for the remediation task.
const TASK_ALIASES: &[&str] = &[
    "smart_question",
    "smart_task",
    "question",
    "task",
    "practical_task",
    "remediation_task",
];

/// Accepted spellings for the benchmark answer.
const ANSWER_ALIASES: &[&str] = &[
    "benchmark_answer",
    "benchmark",
    "answer",
    "model_answer",
    "expected_response",
];

/// Accepted spellings for the remediation rationale.
const RATIONALE_ALIASES: &[&str] = &["rationale", "reasoning", "justification"];

/// A model validation response after key normalization.
///
/// Every field is optional: classification decides what a missing status
/// means, not the parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedValidation {
    pub status: Option<String>,
    pub reasoning: Option<String>,
    pub mapped_content: Option<String>,
    pub citations: Vec<String>,
    pub unmapped_content: Option<String>,
}

/// A model remediation response after key normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRemediation {
    pub task: Option<String>,
    pub benchmark_answer: Option<String>,
    pub rationale: Option<String>,
}

/// Recover a JSON object from free-form model text.
///
/// Tries, in order: the whole trimmed text; a ```json fence; a bare ```
/// fence whose body looks like JSON; the span from the first `{` to the
/// last `}`; a balanced-brace scan that respects string literals. Returns
/// `None` when nothing parses.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    if let Some(inner) = fenced_block(trimmed, "```json") {
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            return Some(value);
        }
    }
    if let Some(inner) = fenced_block(trimmed, "```") {
        let inner = inner.trim();
        if inner.starts_with('{') || inner.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(inner) {
                return Some(value);
            }
        }
    }

    // Embedded in prose: widest span first, then a strict balanced scan
    // for cases where trailing prose contains a stray brace.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }
    if let Some(span) = balanced_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Some(value);
        }
    }

    None
}

/// Body of the first fence opened by `marker`, if closed.
fn fenced_block<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let end = text[start..].find("```")?;
    Some(text[start..start + end].trim())
}

/// First balanced `{...}` span, tracking string literals and escapes.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolve a field through its alias whitelist.
///
/// Object keys are matched case-insensitively with spaces and hyphens
/// folded to underscores; the first alias with a non-null value wins.
fn lookup<'a>(object: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let map = object.as_object()?;
    for alias in aliases {
        for (key, value) in map {
            if fold_key(key) == *alias && !value.is_null() {
                return Some(value);
            }
        }
    }
    None
}

fn fold_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Coerce a field value to text. Strings pass through; lists of strings
/// join with newlines; anything else renders as compact JSON.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Coerce the citation field into a flat list.
///
/// Accepts a plain string, a list of strings, or a list of
/// `{document, pages}`-shaped objects.
fn as_citations(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(map) => {
                    let document = map
                        .get("document")
                        .or_else(|| map.get("document_name"))
                        .and_then(Value::as_str)?;
                    let pages = map.get("pages").or_else(|| map.get("page")).map(as_text);
                    Some(match pages {
                        Some(pages) if !pages.is_empty() => format!("{document} p.{pages}"),
                        _ => document.to_string(),
                    })
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse and normalize a Phase 1 validation response.
///
/// Returns `None` when no JSON object can be recovered; the caller
/// degrades to a failed outcome, it does not retry.
pub fn parse_validation_response(text: &str) -> Option<ParsedValidation> {
    let value = extract_json(text)?;
    if !value.is_object() {
        return None;
    }
    Some(ParsedValidation {
        status: lookup(&value, STATUS_ALIASES).map(as_text),
        reasoning: lookup(&value, REASONING_ALIASES).map(as_text),
        mapped_content: lookup(&value, MAPPED_ALIASES).map(as_text),
        citations: lookup(&value, CITATION_ALIASES)
            .map(as_citations)
            .unwrap_or_default(),
        unmapped_content: lookup(&value, UNMAPPED_ALIASES).map(as_text),
    })
}

/// Parse and normalize a Phase 2 remediation response.
pub fn parse_remediation_response(text: &str) -> Option<ParsedRemediation> {
    let value = extract_json(text)?;
    if !value.is_object() {
        return None;
    }
    // The rationale aliases overlap the task aliases on "reasoning"; the
    // task lookup runs on its own whitelist so the overlap is harmless.
    Some(ParsedRemediation {
        task: lookup(&value, TASK_ALIASES).map(as_text),
        benchmark_answer: lookup(&value, ANSWER_ALIASES).map(as_text),
        rationale: lookup(&value, RATIONALE_ALIASES).map(as_text),
    })
}
