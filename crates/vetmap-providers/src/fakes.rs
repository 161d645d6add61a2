//! Scripted fake provider client (testing only)
//!
//! `ScriptedClient` replays a queue of canned outcomes and records every
//! request it receives, so tests can assert both response handling and
//! call counts.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use vetmap_store::{ExtractedDocument, ExtractedPage};

use crate::client::{
    GenerationRequest, GenerationResponse, ProviderClient, ProviderId, UploadMetadata,
};
use crate::error::{ProviderError, ProviderResult};

/// One scripted generation outcome.
pub enum ScriptedReply {
    /// Return this text as the model response.
    Text(String),
    /// Return this text with grounding citations attached.
    TextWithCitations(String, Vec<String>),
    /// Fail the call with this error.
    Fail(ProviderError),
}

/// Fake provider that replays scripted replies in order.
///
/// When the script runs out, further calls fail with an empty-response
/// error; a test that makes more calls than it scripted is a bug.
pub struct ScriptedClient {
    provider_id: ProviderId,
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    extractions: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            extractions: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain-text reply.
    pub fn push_text(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Text(text.to_string()));
    }

    /// Queue a reply with grounding citations.
    pub fn push_text_with_citations(&self, text: &str, citations: Vec<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::TextWithCitations(text.to_string(), citations));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: ProviderError) {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Fail(error));
    }

    /// Number of generation calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Copy of every generation request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Names of documents submitted for extraction.
    pub fn extracted_documents(&self) -> Vec<String> {
        self.extractions.lock().unwrap().clone()
    }

    /// Names of documents uploaded to the search store.
    pub fn uploaded_documents(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for ScriptedClient {
    fn id(&self) -> ProviderId {
        self.provider_id
    }

    async fn generate_validation(
        &self,
        request: GenerationRequest,
    ) -> ProviderResult<GenerationResponse> {
        self.requests.lock().unwrap().push(request);

        match self.replies.lock().unwrap().pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(GenerationResponse {
                text,
                provider_id: self.provider_id,
                citations: Vec::new(),
            }),
            Some(ScriptedReply::TextWithCitations(text, citations)) => Ok(GenerationResponse {
                text,
                provider_id: self.provider_id,
                citations,
            }),
            Some(ScriptedReply::Fail(error)) => Err(error),
            None => Err(ProviderError::EmptyResponse(
                "scripted client ran out of replies".to_string(),
            )),
        }
    }

    async fn extract_document(
        &self,
        _bytes: &[u8],
        document_name: &str,
    ) -> ProviderResult<ExtractedDocument> {
        self.extractions
            .lock()
            .unwrap()
            .push(document_name.to_string());
        Ok(ExtractedDocument {
            document_name: document_name.to_string(),
            digest: None,
            pages: vec![ExtractedPage {
                number: 1,
                fragments: vec![format!("Extracted text of {document_name}")],
            }],
            tables: vec![],
        })
    }

    async fn upload_document(
        &self,
        _bytes: &[u8],
        document_name: &str,
        _store_ref: &str,
        _metadata: UploadMetadata,
    ) -> ProviderResult<()> {
        self.uploads.lock().unwrap().push(document_name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let client = ScriptedClient::new(ProviderId::TextInjection);
        client.push_text("first");
        client.push_text("second");

        let a = client
            .generate_validation(GenerationRequest::default())
            .await
            .unwrap();
        let b = client
            .generate_validation(GenerationRequest::default())
            .await
            .unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let client = ScriptedClient::new(ProviderId::TextInjection);
        let err = client
            .generate_validation(GenerationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }
}
