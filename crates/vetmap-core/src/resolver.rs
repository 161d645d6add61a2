//! Document content resolution.
//!
//! Given the source documents behind a validation run and (optionally) the
//! requirement being validated, produce the best-available text context:
//! extract any document that has no cached extraction yet, narrow to the
//! pages that mention the requirement, fall back to a bounded all-content
//! window, and finally to an explicit empty sentinel. The resolver itself
//! never fails; degraded content becomes a degraded validation outcome
//! downstream, not a crash.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vetmap_providers::ProviderClient;
use vetmap_store::{
    DocumentDigest, DocumentStore, ExtractedDocument, ExtractionCache, Requirement,
    SourceDocument,
};

/// Matching pages kept when a requirement hint narrows the content.
const MAX_MATCHED_PAGES: usize = 6;
/// Fragment cap across the matched pages.
const MAX_MATCHED_FRAGMENTS: usize = 120;
/// Fragment cap for the all-content fallback window.
const MAX_FALLBACK_FRAGMENTS: usize = 100;
/// Keywords shorter than this are too generic to narrow on.
const MIN_KEYWORD_LEN: usize = 7;

/// Where the grounding text for a validation call comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Grounding {
    /// Named remote store reference (grounded-search providers).
    SearchStore(String),
    /// Inline extracted text (text-injection providers).
    InlineText(String),
    /// Nothing available. Downstream validation treats this as an
    /// automatic unsatisfied-with-reason result.
    Empty,
}

/// Provenance of content included in a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document: String,
    pub pages: Vec<u32>,
}

/// The text corpus grounding one validation call.
///
/// Assembled fresh per call; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentContext {
    pub grounding: Grounding,
    pub sources: Vec<SourceRef>,
}

impl ContentContext {
    /// Context for a grounded-search provider: the remote store holds the
    /// documents, so no extraction happens here.
    pub fn search_store(store_ref: &str) -> Self {
        ContentContext {
            grounding: Grounding::SearchStore(store_ref.to_string()),
            sources: Vec::new(),
        }
    }

    /// The explicit no-content sentinel.
    pub fn empty() -> Self {
        ContentContext {
            grounding: Grounding::Empty,
            sources: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.grounding, Grounding::Empty)
    }
}

/// Resolves inline text context for text-injection providers.
pub struct ContentResolver<'a> {
    documents: &'a dyn DocumentStore,
    cache: &'a dyn ExtractionCache,
    client: &'a dyn ProviderClient,
}

impl<'a> ContentResolver<'a> {
    pub fn new(
        documents: &'a dyn DocumentStore,
        cache: &'a dyn ExtractionCache,
        client: &'a dyn ProviderClient,
    ) -> Self {
        Self {
            documents,
            cache,
            client,
        }
    }

    /// Produce the best-available content context for a requirement.
    ///
    /// Narrowing order: requirement-number matches, then the first long
    /// keyword of the requirement text, then a bounded window over all
    /// content, then the empty sentinel.
    pub async fn resolve(
        &self,
        documents: &[SourceDocument],
        hint: Option<&Requirement>,
    ) -> ContentContext {
        let extracted = self.ensure_extracted(documents).await;
        if extracted.is_empty() {
            return ContentContext::empty();
        }

        if let Some(requirement) = hint {
            let mut pages = match_pages(&extracted, &number_matcher(&requirement.number));
            if pages.is_empty() {
                if let Some(keyword) = first_keyword(&requirement.text) {
                    debug!(keyword = %keyword, "no requirement-number match, trying keyword");
                    pages = match_pages(&extracted, &keyword_matcher(&keyword));
                }
            }
            if !pages.is_empty() {
                pages.truncate(MAX_MATCHED_PAGES);
                return assemble(&extracted, &pages, MAX_MATCHED_FRAGMENTS);
            }
        }

        // No hint, or nothing matched: everything available, bounded.
        let all_pages: Vec<(usize, u32)> = extracted
            .iter()
            .enumerate()
            .flat_map(|(doc_idx, doc)| doc.pages.iter().map(move |p| (doc_idx, p.number)))
            .collect();
        if all_pages.is_empty() {
            return ContentContext::empty();
        }
        assemble(&extracted, &all_pages, MAX_FALLBACK_FRAGMENTS)
    }

    /// Extraction is idempotent per document: a cached result short-
    /// circuits; otherwise download, extract, persist, then proceed.
    async fn ensure_extracted(&self, documents: &[SourceDocument]) -> Vec<ExtractedDocument> {
        let mut extracted = Vec::new();
        for document in documents {
            match self.cache.get(&document.id).await {
                Ok(Some(cached)) => {
                    extracted.push(cached);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(document = %document.name, error = %e, "extraction cache read failed");
                }
            }

            let bytes = match self.documents.download(&document.storage_path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(document = %document.name, error = %e, "document download failed");
                    continue;
                }
            };
            let mut result = match self.client.extract_document(&bytes, &document.name).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(document = %document.name, error = %e, "document extraction failed");
                    continue;
                }
            };
            result.digest = Some(DocumentDigest::from_bytes(&bytes));

            if let Err(e) = self.cache.put(&document.id, &result).await {
                warn!(document = %document.name, error = %e, "failed to persist extraction");
            }
            extracted.push(result);
        }
        extracted
    }
}

/// Matcher for an exact requirement-number mention with non-alphanumeric
/// boundaries, so "1.2" does not match inside "11.2".
fn number_matcher(number: &str) -> Regex {
    let escaped = regex::escape(number.trim());
    Regex::new(&format!(
        "(?i)(^|[^0-9A-Za-z]){escaped}([^0-9A-Za-z]|$)"
    ))
    .unwrap_or_else(|_| Regex::new("$^").unwrap())
}

/// Case-insensitive substring matcher for a keyword.
fn keyword_matcher(keyword: &str) -> Regex {
    let escaped = regex::escape(keyword);
    Regex::new(&format!("(?i){escaped}")).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

/// The first sufficiently long word of the requirement text.
fn first_keyword(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_ascii_alphanumeric())
                .to_string()
        })
        .find(|word| word.len() >= MIN_KEYWORD_LEN)
}

/// Pages (doc index, page number) with at least one matching fragment, in
/// document/page order.
fn match_pages(extracted: &[ExtractedDocument], matcher: &Regex) -> Vec<(usize, u32)> {
    let mut pages = Vec::new();
    for (doc_idx, doc) in extracted.iter().enumerate() {
        for page in &doc.pages {
            if page.fragments.iter().any(|f| matcher.is_match(f)) {
                pages.push((doc_idx, page.number));
            }
        }
    }
    pages
}

/// Expand the selected pages into an inline-text context, keeping whole
/// pages (surrounding context matters more than isolated sentences) up to
/// the fragment cap.
fn assemble(
    extracted: &[ExtractedDocument],
    pages: &[(usize, u32)],
    fragment_cap: usize,
) -> ContentContext {
    let mut text = String::new();
    let mut sources: Vec<SourceRef> = Vec::new();
    let mut fragments_used = 0usize;

    for &(doc_idx, page_number) in pages {
        if fragments_used >= fragment_cap {
            break;
        }
        let doc = &extracted[doc_idx];
        let Some(page) = doc.pages.iter().find(|p| p.number == page_number) else {
            continue;
        };

        let remaining = fragment_cap - fragments_used;
        let take = page.fragments.len().min(remaining);
        if take == 0 {
            continue;
        }

        text.push_str(&format!(
            "--- {} (page {}) ---\n",
            doc.document_name, page_number
        ));
        for fragment in page.fragments.iter().take(take) {
            text.push_str(fragment);
            text.push('\n');
        }
        text.push('\n');
        fragments_used += take;

        match sources.iter_mut().find(|s| s.document == doc.document_name) {
            Some(source) => source.pages.push(page_number),
            None => sources.push(SourceRef {
                document: doc.document_name.clone(),
                pages: vec![page_number],
            }),
        }
    }

    if text.is_empty() {
        return ContentContext::empty();
    }
    ContentContext {
        grounding: Grounding::InlineText(text),
        sources,
    }
}
