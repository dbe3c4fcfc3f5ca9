//! Generation collaborator seam.
//!
//! The orchestrator hands `{system_instructions, user_input}` to whatever
//! implements `GenerationProvider` and treats the result as opaque text.

use async_trait::async_trait;

use crate::error::GenerationError;

/// A generation request: assembled context plus the raw task text.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instructions: String,
    pub user_input: String,
}

/// Opaque generation result.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub content: String,
    /// Model identifier that produced the response, for logging.
    pub model: String,
}

/// Text-generation collaborator.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Model name for logging.
    fn model_name(&self) -> &str;

    /// Run one generation call.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}

/// Canned provider for tests — echoes a fixed response.
#[cfg(test)]
pub struct StubProvider {
    pub response: String,
}

#[cfg(test)]
#[async_trait]
impl GenerationProvider for StubProvider {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        Ok(GenerationResponse {
            content: self.response.clone(),
            model: "stub".into(),
        })
    }
}
