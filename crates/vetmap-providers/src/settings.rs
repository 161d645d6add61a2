//! Provider configuration.
//!
//! Settings are read from the environment once per orchestration call via
//! [`ProviderSettings::from_env`] and threaded explicitly into the factory
//! and orchestrator, never re-read ad hoc inside nested functions. Within
//! one validation run the configuration is fixed; re-reading on the next
//! invocation allows hot-swapping backends between deployments without a
//! code change.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Which AI backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Gemini with a File Search store (grounded search).
    Google,
    /// Azure OpenAI with Document Intelligence (text injection).
    Azure,
}

impl ProviderKind {
    /// Parse a configuration value, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" | "gemini" => Ok(Self::Google),
            "azure" | "azure_openai" => Ok(Self::Azure),
            other => Err(ProviderError::Configuration(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// How validation calls are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationMode {
    /// The pipeline calls the backend directly.
    Direct,
    /// An external workflow engine (n8n) is triggered instead.
    Webhook,
}

impl OrchestrationMode {
    /// Parse a configuration value, case-insensitively. Unset or
    /// unrecognized values fall back to direct dispatch.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "n8n" | "webhook" => Self::Webhook,
            _ => Self::Direct,
        }
    }
}

/// Credentials and endpoints for the grounded-search backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Named File Search store documents are indexed into.
    pub file_search_store: Option<String>,
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        GeminiConfig {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-pro".to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            file_search_store: std::env::var("GEMINI_FILE_SEARCH_STORE").ok(),
        }
    }
}

/// Credentials and endpoints for the text-injection backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub doc_intelligence_endpoint: String,
    pub doc_intelligence_key: String,
}

impl AzureConfig {
    pub fn from_env() -> Self {
        AzureConfig {
            endpoint: std::env::var("AZURE_OPENAI_ENDPOINT").unwrap_or_default(),
            api_key: std::env::var("AZURE_OPENAI_KEY").unwrap_or_default(),
            deployment: std::env::var("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|_| "gpt-4o".to_string()),
            api_version: std::env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| "2024-06-01".to_string()),
            doc_intelligence_endpoint: std::env::var("AZURE_DOC_INTELLIGENCE_ENDPOINT")
                .unwrap_or_default(),
            doc_intelligence_key: std::env::var("AZURE_DOC_INTELLIGENCE_KEY").unwrap_or_default(),
        }
    }
}

/// Process-wide provider configuration, read once per orchestration call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub provider: ProviderKind,
    pub mode: OrchestrationMode,
    pub gemini: GeminiConfig,
    pub azure: AzureConfig,
    /// Webhook target when the orchestration mode is `Webhook`.
    pub webhook_url: Option<String>,
}

impl ProviderSettings {
    /// Read the full configuration from the environment.
    ///
    /// `VETMAP_AI_PROVIDER` selects the backend ("google" or "azure",
    /// case-insensitive; defaults to google). `VETMAP_ORCHESTRATION_MODE`
    /// selects dispatch ("n8n" triggers the external workflow path).
    pub fn from_env() -> Result<Self, ProviderError> {
        let provider = match std::env::var("VETMAP_AI_PROVIDER") {
            Ok(value) => ProviderKind::parse(&value)?,
            Err(_) => ProviderKind::Google,
        };
        let mode = std::env::var("VETMAP_ORCHESTRATION_MODE")
            .map(|v| OrchestrationMode::parse(&v))
            .unwrap_or(OrchestrationMode::Direct);

        Ok(ProviderSettings {
            provider,
            mode,
            gemini: GeminiConfig::from_env(),
            azure: AzureConfig::from_env(),
            webhook_url: std::env::var("VETMAP_WEBHOOK_URL").ok(),
        })
    }

    /// Construct settings for a specific provider with empty credentials
    /// (tests fill in what they need).
    pub fn for_provider(provider: ProviderKind) -> Self {
        ProviderSettings {
            provider,
            mode: OrchestrationMode::Direct,
            gemini: GeminiConfig::default(),
            azure: AzureConfig::default(),
            webhook_url: None,
        }
    }

    /// Set the orchestration mode.
    pub fn with_mode(mut self, mode: OrchestrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the webhook URL.
    pub fn with_webhook_url(mut self, url: &str) -> Self {
        self.webhook_url = Some(url.to_string());
        self
    }

    /// The orchestration mode that actually applies.
    ///
    /// The webhook path exists only for the grounded-search deployment;
    /// for the text-injection backend the mode is overridden to direct
    /// dispatch.
    pub fn effective_mode(&self) -> OrchestrationMode {
        match self.provider {
            ProviderKind::Azure => OrchestrationMode::Direct,
            ProviderKind::Google => self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse_case_insensitive() {
        assert_eq!(ProviderKind::parse("AZURE").unwrap(), ProviderKind::Azure);
        assert_eq!(ProviderKind::parse("azure").unwrap(), ProviderKind::Azure);
        assert_eq!(ProviderKind::parse("Google").unwrap(), ProviderKind::Google);
        assert_eq!(ProviderKind::parse("gemini").unwrap(), ProviderKind::Google);
        assert!(ProviderKind::parse("openrouter").is_err());
    }

    #[test]
    fn test_orchestration_mode_parse() {
        assert_eq!(OrchestrationMode::parse("n8n"), OrchestrationMode::Webhook);
        assert_eq!(OrchestrationMode::parse("N8N"), OrchestrationMode::Webhook);
        assert_eq!(
            OrchestrationMode::parse("direct"),
            OrchestrationMode::Direct
        );
        assert_eq!(OrchestrationMode::parse(""), OrchestrationMode::Direct);
    }

    #[test]
    fn test_azure_ignores_webhook_mode() {
        let settings = ProviderSettings::for_provider(ProviderKind::Azure)
            .with_mode(OrchestrationMode::Webhook);
        assert_eq!(settings.effective_mode(), OrchestrationMode::Direct);
    }

    #[test]
    fn test_google_honors_webhook_mode() {
        let settings = ProviderSettings::for_provider(ProviderKind::Google)
            .with_mode(OrchestrationMode::Webhook);
        assert_eq!(settings.effective_mode(), OrchestrationMode::Webhook);
    }
}
