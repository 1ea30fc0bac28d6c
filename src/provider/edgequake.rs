//! Backend over `edgequake-llm`, for providers other than Gemini.
//!
//! `ProviderFactory::create_llm_provider` reads the provider's own API key
//! variable (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …), so this backend does
//! not use [`crate::config::ReviewConfig::api_key`]. The factory call doubles
//! as the construction check in [`GenerativeBackend::bind`].
//!
//! There is no listing endpoint in `edgequake-llm`; live discovery is
//! reported as unsupported and the resolver turns that into
//! `NoModelsAvailable`.

use super::classify::provider_error;
use super::{GenerationRequest, GenerativeBackend, ModelId, ModelInfo};
use crate::error::{ProviderError, ProviderErrorKind};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Generation through any provider `edgequake-llm` can build by name.
pub struct EdgequakeBackend {
    provider_name: String,
}

impl EdgequakeBackend {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
        }
    }

    fn create(&self, model: &ModelId) -> Result<Arc<dyn LLMProvider>, ProviderError> {
        ProviderFactory::create_llm_provider(&self.provider_name, model.as_str()).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::ModelNotFound,
                format!("{} cannot serve '{}': {e}", self.provider_name, model),
            )
        })
    }
}

/// Build the chat message list for one request.
fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    match request.image {
        Some(ref image) => vec![ChatMessage::user_with_images(
            request.prompt.as_str(),
            vec![ImageData::new(image.data.clone(), image.mime_type.as_str())],
        )],
        None => vec![ChatMessage::user(request.prompt.as_str())],
    }
}

fn build_options(request: &GenerationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        ..Default::default()
    }
}

#[async_trait]
impl GenerativeBackend for EdgequakeBackend {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn bind(&self, model: &ModelId) -> Result<(), ProviderError> {
        self.create(model).map(|_| ())
    }

    async fn generate(
        &self,
        model: &ModelId,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let provider = self.create(model)?;
        let messages = build_messages(request);
        let options = build_options(request);

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| provider_error(None, e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            model, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Err(ProviderError::new(
            ProviderErrorKind::InvalidRequest,
            format!(
                "model discovery is not supported for provider '{}'",
                self.provider_name
            ),
        ))
    }
}
