//! Generative-model provider boundary.
//!
//! Everything above this module talks to a [`GenerativeBackend`]; everything
//! below it speaks a concrete wire protocol. The trait is the only seam the
//! pipeline needs, which keeps the retry policy, the resolver and the
//! orchestrator testable with an in-process mock.
//!
//! Two backends ship with the crate:
//!
//! * [`gemini::GeminiClient`]: native Gemini REST. Supports live model
//!   discovery and takes its API key explicitly.
//! * [`edgequake::EdgequakeBackend`]: any provider `edgequake-llm` knows
//!   (OpenAI, Anthropic, Mistral, Ollama …). No discovery.
//!
//! A backend is built once per run from [`crate::config::ReviewConfig`]
//! (see [`backend_for`]) and passed by reference; there is no process-wide
//! provider state.

pub mod classify;
pub mod edgequake;
pub mod gemini;

use crate::config::ReviewConfig;
use crate::error::{ProviderError, ReviewError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Capability tag a model must advertise to be usable for generation.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Opaque name of a generative-model endpoint, e.g. `gemini-1.5-flash`
/// or `models/gemini-1.5-pro-latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without a `models/` resource prefix.
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix("models/").unwrap_or(&self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An image attached to a generation request, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    /// Standard base64, no data-URI prefix.
    pub data: String,
}

/// One generation request: a text prompt, optionally with one image.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<ImagePart>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: ImagePart) -> Self {
        Self {
            image: Some(image),
            ..Self::text(prompt)
        }
    }

    /// Apply the sampling knobs from the run configuration.
    pub fn tuned(mut self, config: &ReviewConfig) -> Self {
        self.temperature = config.temperature;
        self.max_output_tokens = config.max_output_tokens;
        self
    }
}

/// A model advertised by the provider's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: ModelId,
    pub supported_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generation(&self) -> bool {
        self.supported_methods.iter().any(|m| m == GENERATE_CONTENT)
    }
}

/// A generative-model provider.
///
/// Implementations hold credentials and an HTTP client but no per-run
/// mutable state, so one instance may serve a whole run.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short provider name for logs (`"gemini"`, `"openai"` …).
    fn name(&self) -> &str;

    /// Check that a handle for `model` can be constructed.
    ///
    /// This is a local check (identifier syntax, provider factory), never a
    /// network round-trip.
    fn bind(&self, model: &ModelId) -> Result<(), ProviderError>;

    /// Run one generation call and return the response text.
    async fn generate(
        &self,
        model: &ModelId,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError>;

    /// List every model the credentials can see.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;
}

/// Build the backend for one run.
///
/// 1. A pre-built backend in the config wins (tests, custom middleware).
/// 2. `"gemini"` (the default) or `"google"` builds a [`gemini::GeminiClient`]
///    with the explicit API key.
/// 3. Any other name is handed to `edgequake-llm`.
pub fn backend_for(config: &ReviewConfig) -> Result<Arc<dyn GenerativeBackend>, ReviewError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if config.uses_native_gemini() {
        let client = gemini::GeminiClient::new(
            &config.api_key,
            &config.provider_base_url,
            config.api_timeout_secs,
        )?;
        return Ok(Arc::new(client));
    }
    Ok(Arc::new(edgequake::EdgequakeBackend::new(&config.provider_name)))
}
