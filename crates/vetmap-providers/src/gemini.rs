//! Grounded-search backend client (Gemini + File Search).
//!
//! Validation calls are grounded against a named remote File Search store;
//! the model retrieves relevant document chunks itself, so no document
//! text is embedded in the prompt. Document ingestion is a multipart
//! upload returning a long-running operation polled to completion.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use vetmap_store::ExtractedDocument;

use crate::client::{
    GenerationRequest, GenerationResponse, ProviderClient, ProviderId, UploadMetadata,
};
use crate::error::{ProviderError, ProviderResult};
use crate::settings::GeminiConfig;

/// Upload operations are polled every 2s with a 60s deadline.
const UPLOAD_POLL_INTERVAL: Duration = Duration::from_secs(2);
const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Grounded-search client for the Gemini generateContent API.
#[derive(Debug)]
pub struct GroundedSearchClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

// --- wire types -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ContentPart>>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks")]
    grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(rename = "retrievedContext")]
    retrieved_context: Option<RetrievedContext>,
}

#[derive(Debug, Deserialize)]
struct RetrievedContext {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    name: Option<String>,
    done: Option<bool>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: Option<String>,
}

// --------------------------------------------------------------------------

impl GroundedSearchClient {
    /// Create a client from resolved configuration.
    ///
    /// Fails when the API key is missing: the credential check happens at
    /// construction so a misconfigured deployment surfaces before the first
    /// requirement is validated.
    pub fn new(config: GeminiConfig) -> ProviderResult<Self> {
        if config.api_key.is_empty() {
            return Err(ProviderError::Configuration(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }
        let http_client = reqwest::Client::builder()
            .user_agent("vetmap/0.4")
            .build()?;
        Ok(GroundedSearchClient {
            config,
            http_client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    fn build_body(&self, request: &GenerationRequest, store: &str) -> serde_json::Value {
        let config = request.generation_config.clone().unwrap_or_default();
        let mut generation_config = json!({
            "temperature": config.temperature,
            "maxOutputTokens": config.max_output_tokens,
        });
        if let Some(top_p) = config.top_p {
            generation_config["topP"] = json!(top_p);
        }
        if let Some(top_k) = config.top_k {
            generation_config["topK"] = json!(top_k);
        }
        if let Some(schema) = &request.output_schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }

        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "tools": [{
                "fileSearch": { "fileSearchStoreNames": [store] },
            }],
            "generationConfig": generation_config,
        });
        if let Some(system) = &request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }

    /// Poll a long-running operation until done or the deadline passes.
    async fn poll_operation(&self, operation_name: &str) -> ProviderResult<()> {
        let deadline = Instant::now() + Duration::from_secs(UPLOAD_TIMEOUT_SECS);
        let url = format!("{}/v1beta/{}", self.config.base_url, operation_name);

        loop {
            let response = self
                .http_client
                .get(&url)
                .query(&[("key", self.config.api_key.as_str())])
                .send()
                .await?;
            let status: OperationStatus = response.json().await?;

            if let Some(error) = status.error {
                return Err(ProviderError::Api {
                    status: 500,
                    message: error
                        .message
                        .unwrap_or_else(|| "operation failed".to_string()),
                });
            }
            if status.done.unwrap_or(false) {
                debug!(operation = %operation_name, "upload operation complete");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProviderError::Timeout {
                    operation: operation_name.to_string(),
                    seconds: UPLOAD_TIMEOUT_SECS,
                });
            }
            tokio::time::sleep(UPLOAD_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl ProviderClient for GroundedSearchClient {
    fn id(&self) -> ProviderId {
        ProviderId::GroundedSearch
    }

    async fn generate_validation(
        &self,
        request: GenerationRequest,
    ) -> ProviderResult<GenerationResponse> {
        // The store reference may come with the request or from deployment
        // configuration; without one there is nothing to ground against.
        let store = request
            .search_store
            .clone()
            .or_else(|| self.config.file_search_store.clone())
            .ok_or_else(|| {
                ProviderError::Configuration(
                    "grounded-search backend requires a file search store reference".to_string(),
                )
            })?;

        let body = self.build_body(&request, &store);
        let response = self
            .http_client
            .post(self.generate_url())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let http_status = response.status();
        if !http_status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: http_status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .ok_or_else(|| ProviderError::EmptyResponse("no candidates returned".to_string()))?;

        let text = candidate
            .content
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(
                "candidate contained no text parts".to_string(),
            ));
        }

        // Grounding chunks name the source documents the model retrieved.
        let citations = candidate
            .grounding_metadata
            .and_then(|m| m.grounding_chunks)
            .map(|chunks| {
                chunks
                    .into_iter()
                    .filter_map(|c| c.retrieved_context.and_then(|r| r.title))
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerationResponse {
            text,
            provider_id: ProviderId::GroundedSearch,
            citations,
        })
    }

    async fn extract_document(
        &self,
        _bytes: &[u8],
        _document_name: &str,
    ) -> ProviderResult<ExtractedDocument> {
        Err(ProviderError::Unsupported {
            provider: self.id().to_string(),
            operation: "extract_document".to_string(),
        })
    }

    async fn upload_document(
        &self,
        bytes: &[u8],
        document_name: &str,
        store_ref: &str,
        metadata: UploadMetadata,
    ) -> ProviderResult<()> {
        info!(document = %document_name, store = %store_ref, "uploading document to search store");

        let upload_url = format!(
            "{}/upload/v1beta/{}:uploadToFileSearchStore",
            self.config.base_url, store_ref
        );

        let mut custom_metadata = Vec::new();
        if let Some(unit_code) = &metadata.unit_code {
            custom_metadata.push(json!({ "key": "unit_code", "stringValue": unit_code }));
        }
        if let Some(document_type) = &metadata.document_type {
            custom_metadata.push(json!({ "key": "document_type", "stringValue": document_type }));
        }
        let config_part = json!({
            "displayName": document_name,
            "customMetadata": custom_metadata,
        });

        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(config_part.to_string())
                    .mime_str("application/json")
                    .map_err(|e| ProviderError::Configuration(e.to_string()))?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(document_name.to_string()),
            );

        let response = self
            .http_client
            .post(&upload_url)
            .query(&[("key", self.config.api_key.as_str())])
            .multipart(form)
            .send()
            .await?;

        let http_status = response.status();
        if !http_status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: http_status.as_u16(),
                message,
            });
        }

        let operation: OperationStatus = response.json().await?;
        match operation.name {
            Some(name) => self.poll_operation(&name).await,
            None => {
                // Some store configurations import synchronously.
                if operation.done.unwrap_or(false) {
                    Ok(())
                } else {
                    warn!(document = %document_name, "upload returned no operation handle");
                    Err(ProviderError::EmptyResponse(
                        "upload returned neither an operation nor a completed import".to_string(),
                    ))
                }
            }
        }
    }
}
