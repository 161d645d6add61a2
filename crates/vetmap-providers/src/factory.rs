//! Provider selection.
//!
//! A fresh client handle is constructed per orchestration call from the
//! configuration read at that point; there is no shared "current provider"
//! state to mutate.

use tracing::info;

use crate::azure::TextInjectionClient;
use crate::client::ProviderClient;
use crate::error::{ProviderError, ProviderResult};
use crate::gemini::GroundedSearchClient;
use crate::settings::{OrchestrationMode, ProviderKind, ProviderSettings};

/// How this validation call should be dispatched.
pub enum DispatchPlan {
    /// The pipeline calls the backend directly with this client.
    Direct(Box<dyn ProviderClient>),
    /// An external workflow engine owns the call; trigger it at this URL.
    Webhook { url: String },
}

impl std::fmt::Debug for DispatchPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct(client) => f.debug_tuple("Direct").field(&client.id()).finish(),
            Self::Webhook { url } => f.debug_struct("Webhook").field("url", url).finish(),
        }
    }
}

/// Build a client for the configured backend.
pub fn build_client(settings: &ProviderSettings) -> ProviderResult<Box<dyn ProviderClient>> {
    match settings.provider {
        ProviderKind::Google => {
            let client = GroundedSearchClient::new(settings.gemini.clone())?;
            Ok(Box::new(client))
        }
        ProviderKind::Azure => {
            let client = TextInjectionClient::new(settings.azure.clone())?;
            Ok(Box::new(client))
        }
    }
}

/// Resolve the dispatch plan for one orchestration call.
///
/// The webhook path is only meaningful for the grounded-search deployment;
/// `ProviderSettings::effective_mode` collapses azure + webhook to direct
/// dispatch.
pub fn dispatch_plan(settings: &ProviderSettings) -> ProviderResult<DispatchPlan> {
    match settings.effective_mode() {
        OrchestrationMode::Webhook => {
            let url = settings.webhook_url.clone().ok_or_else(|| {
                ProviderError::Configuration(
                    "webhook orchestration mode requires VETMAP_WEBHOOK_URL".to_string(),
                )
            })?;
            info!(url = %url, "dispatching validation via external workflow");
            Ok(DispatchPlan::Webhook { url })
        }
        OrchestrationMode::Direct => {
            let client = build_client(settings)?;
            info!(provider = %client.id(), "dispatching validation directly");
            Ok(DispatchPlan::Direct(client))
        }
    }
}
