//! Generation provider construction.
//!
//! The orchestrator only knows `GenerationProvider`; this module builds one
//! from configuration. Transport is rig-core, bridged by `RigAdapter`, and
//! the API key stays inside `SecretString` until client construction.

pub mod provider;
mod rig_adapter;

pub use provider::{GenerationProvider, GenerationRequest, GenerationResponse};
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;
use tracing::info;

use crate::error::GenerationError;

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationBackend {
    Anthropic,
    OpenAi,
}

impl GenerationBackend {
    /// Short label for logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

/// Everything needed to construct a provider.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub backend: GenerationBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Build the provider for the configured backend.
pub fn create_provider(
    config: &GenerationConfig,
) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
    let construction_failed = |e: &dyn std::fmt::Display| GenerationError::RequestFailed {
        provider: config.backend.label().to_string(),
        reason: format!("Client construction failed: {e}"),
    };

    let provider: Arc<dyn GenerationProvider> = match config.backend {
        GenerationBackend::Anthropic => {
            use rig::providers::anthropic;
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(config.api_key.expose_secret())
                    .map_err(|e| construction_failed(&e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
        GenerationBackend::OpenAi => {
            use rig::providers::openai;
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(config.api_key.expose_secret())
                    .map_err(|e| construction_failed(&e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
    };

    info!(
        backend = config.backend.label(),
        model = %config.model,
        "Generation provider ready"
    );
    Ok(provider)
}
