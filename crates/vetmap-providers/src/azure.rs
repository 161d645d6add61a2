//! Text-injection backend client (Azure OpenAI + Document Intelligence).
//!
//! This backend has no native grounding mechanism: extracted document text
//! is embedded directly into the prompt as a literal document-content
//! section. Extraction runs through the Document Intelligence layout model
//! with poll-until-done semantics.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use vetmap_store::{ExtractedDocument, ExtractedPage, ExtractedTable};

use crate::client::{
    GenerationRequest, GenerationResponse, ProviderClient, ProviderId, UploadMetadata,
};
use crate::error::{ProviderError, ProviderResult};
use crate::settings::AzureConfig;

/// Extraction operations are polled every 2s with a 120s deadline.
const EXTRACT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const EXTRACT_TIMEOUT_SECS: u64 = 120;

/// Marker separating the prompt from the injected document text.
const DOCUMENT_SECTION_HEADER: &str = "--- DOCUMENT CONTENT ---";

/// Text-injection client for Azure OpenAI chat completions.
#[derive(Debug)]
pub struct TextInjectionClient {
    config: AzureConfig,
    http_client: reqwest::Client,
}

// --- wire types -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeStatus {
    status: Option<String>,
    #[serde(rename = "analyzeResult")]
    analyze_result: Option<AnalyzeResult>,
    error: Option<AnalyzeError>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    pages: Option<Vec<AnalyzePage>>,
    tables: Option<Vec<AnalyzeTable>>,
}

#[derive(Debug, Deserialize)]
struct AnalyzePage {
    #[serde(rename = "pageNumber")]
    page_number: u32,
    lines: Option<Vec<AnalyzeLine>>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeLine {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeTable {
    #[serde(rename = "rowCount")]
    row_count: u32,
    #[serde(rename = "columnCount")]
    column_count: u32,
    cells: Option<Vec<AnalyzeCell>>,
    #[serde(rename = "boundingRegions")]
    bounding_regions: Option<Vec<BoundingRegion>>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeCell {
    #[serde(rename = "rowIndex")]
    row_index: u32,
    #[serde(rename = "columnIndex")]
    column_index: u32,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoundingRegion {
    #[serde(rename = "pageNumber")]
    page_number: u32,
}

// --------------------------------------------------------------------------

impl TextInjectionClient {
    /// Create a client from resolved configuration.
    pub fn new(config: AzureConfig) -> ProviderResult<Self> {
        if config.endpoint.is_empty() || config.api_key.is_empty() {
            return Err(ProviderError::Configuration(
                "AZURE_OPENAI_ENDPOINT / AZURE_OPENAI_KEY are not set".to_string(),
            ));
        }
        let http_client = reqwest::Client::builder()
            .user_agent("vetmap/0.4")
            .build()?;
        Ok(TextInjectionClient {
            config,
            http_client,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/prebuilt-layout:analyze?api-version=2024-02-29-preview",
            self.config.doc_intelligence_endpoint.trim_end_matches('/')
        )
    }

    /// Assemble the user message: prompt first, then the literal document
    /// content section.
    fn build_user_message(prompt: &str, document_text: &str) -> String {
        format!("{prompt}\n\n{DOCUMENT_SECTION_HEADER}\n{document_text}")
    }

    fn map_analyze_result(result: AnalyzeResult, document_name: &str) -> ExtractedDocument {
        let pages = result
            .pages
            .unwrap_or_default()
            .into_iter()
            .map(|p| ExtractedPage {
                number: p.page_number,
                fragments: p
                    .lines
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|l| l.content)
                    .collect(),
            })
            .collect();

        let tables = result
            .tables
            .unwrap_or_default()
            .into_iter()
            .map(|t| {
                let page_number = t
                    .bounding_regions
                    .as_ref()
                    .and_then(|r| r.first())
                    .map(|r| r.page_number)
                    .unwrap_or(0);
                let mut rows =
                    vec![vec![String::new(); t.column_count as usize]; t.row_count as usize];
                for cell in t.cells.unwrap_or_default() {
                    let (row, col) = (cell.row_index as usize, cell.column_index as usize);
                    if row < rows.len() && col < rows[row].len() {
                        rows[row][col] = cell.content.unwrap_or_default();
                    }
                }
                ExtractedTable { page_number, rows }
            })
            .collect();

        ExtractedDocument {
            document_name: document_name.to_string(),
            digest: None,
            pages,
            tables,
        }
    }

    /// Poll the analyze operation until it succeeds or the deadline passes.
    async fn poll_analyze(&self, operation_url: &str) -> ProviderResult<AnalyzeResult> {
        let deadline = Instant::now() + Duration::from_secs(EXTRACT_TIMEOUT_SECS);

        loop {
            let response = self
                .http_client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.config.doc_intelligence_key)
                .send()
                .await?;
            let status: AnalyzeStatus = response.json().await?;

            match status.status.as_deref() {
                Some("succeeded") => {
                    debug!(operation = %operation_url, "extraction complete");
                    return status.analyze_result.ok_or_else(|| {
                        ProviderError::EmptyResponse(
                            "analyze succeeded without a result payload".to_string(),
                        )
                    });
                }
                Some("failed") => {
                    let message = status
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "analysis failed".to_string());
                    return Err(ProviderError::Api {
                        status: 500,
                        message,
                    });
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(ProviderError::Timeout {
                    operation: "document extraction".to_string(),
                    seconds: EXTRACT_TIMEOUT_SECS,
                });
            }
            tokio::time::sleep(EXTRACT_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl ProviderClient for TextInjectionClient {
    fn id(&self) -> ProviderId {
        ProviderId::TextInjection
    }

    async fn generate_validation(
        &self,
        request: GenerationRequest,
    ) -> ProviderResult<GenerationResponse> {
        let document_text = request.document_text.as_deref().ok_or_else(|| {
            ProviderError::Configuration(
                "text-injection backend requires pre-extracted document text".to_string(),
            )
        })?;

        let config = request.generation_config.clone().unwrap_or_default();
        let mut messages = Vec::new();
        if let Some(system) = &request.system_instruction {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({
            "role": "user",
            "content": Self::build_user_message(&request.prompt, document_text),
        }));

        let mut body = json!({
            "messages": messages,
            "temperature": config.temperature,
            "max_tokens": config.max_output_tokens,
        });
        if let Some(top_p) = config.top_p {
            body["top_p"] = json!(top_p);
        }
        if request.output_schema.is_some() {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http_client
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
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

        let parsed: ChatCompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| ProviderError::EmptyResponse("no message content".to_string()))?;

        Ok(GenerationResponse {
            text,
            provider_id: ProviderId::TextInjection,
            // No native grounding; citations come from the model response
            // body, which the pipeline parses separately.
            citations: Vec::new(),
        })
    }

    async fn extract_document(
        &self,
        bytes: &[u8],
        document_name: &str,
    ) -> ProviderResult<ExtractedDocument> {
        if self.config.doc_intelligence_endpoint.is_empty() {
            return Err(ProviderError::Configuration(
                "AZURE_DOC_INTELLIGENCE_ENDPOINT is not set".to_string(),
            ));
        }

        info!(document = %document_name, "submitting document for layout analysis");

        let response = self
            .http_client
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.config.doc_intelligence_key)
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
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

        let operation_url = response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ProviderError::EmptyResponse(
                    "analyze response carried no operation-location header".to_string(),
                )
            })?;

        let result = self.poll_analyze(&operation_url).await?;
        Ok(Self::map_analyze_result(result, document_name))
    }

    async fn upload_document(
        &self,
        _bytes: &[u8],
        _document_name: &str,
        _store_ref: &str,
        _metadata: UploadMetadata,
    ) -> ProviderResult<()> {
        Err(ProviderError::Unsupported {
            provider: self.id().to_string(),
            operation: "upload_document".to_string(),
        })
    }
}
