//! Bridges rig's `CompletionModel` to our `GenerationProvider` trait.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};

use crate::error::GenerationError;
use crate::llm::provider::{GenerationProvider, GenerationRequest, GenerationResponse};

/// Max tokens for a single generation call.
const MAX_TOKENS: u64 = 2048;

/// Adapter wrapping a rig completion model.
pub struct RigAdapter<M: CompletionModel> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl<M: CompletionModel> GenerationProvider for RigAdapter<M> {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let response = self
            .model
            .completion_request(Message::user(request.user_input))
            .preamble(request.system_instructions)
            .max_tokens(MAX_TOKENS)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        // Concatenate the text parts of the response; tool calls are not
        // used on this path.
        let content: String = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(GenerationError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "empty completion".to_string(),
            });
        }

        Ok(GenerationResponse {
            content,
            model: self.model_name.clone(),
        })
    }
}
