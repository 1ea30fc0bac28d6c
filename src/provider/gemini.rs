//! Native Gemini REST backend (`generativelanguage.googleapis.com/v1beta`).
//!
//! Talking to the REST API directly (rather than through a generic chat SDK)
//! gives us the two things the pipeline needs and SDKs tend to hide: the
//! model listing with `supportedGenerationMethods`, and the raw HTTP status
//! for error classification.

use super::classify::provider_error;
use super::{GenerationRequest, GenerativeBackend, ModelId, ModelInfo};
use crate::error::{ProviderError, ProviderErrorKind, ReviewError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Public Gemini API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Page size for the model listing; the API caps it at 1000.
const LIST_PAGE_SIZE: u32 = 1000;

/// Gemini REST client holding one API key.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReviewError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self, model: &ModelId) -> String {
        format!("{}/{}:generateContent", self.base_url, resource_name(model))
    }
}

/// `gemini-1.5-flash` → `models/gemini-1.5-flash`; already-qualified names
/// (`models/…`, `tunedModels/…`) pass through.
pub fn resource_name(model: &ModelId) -> String {
    let id = model.as_str();
    if id.contains('/') {
        id.to_string()
    } else {
        format!("models/{id}")
    }
}

/// Local identifier check used by [`GenerativeBackend::bind`].
fn validate_model_id(id: &str) -> Result<(), ProviderError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/'))
        && !id.starts_with('/')
        && !id.ends_with('/');
    if valid {
        Ok(())
    } else {
        Err(ProviderError::new(
            ProviderErrorKind::ModelNotFound,
            format!("'{id}' is not a valid model identifier"),
        ))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn bind(&self, model: &ModelId) -> Result<(), ProviderError> {
        validate_model_id(model.as_str())
    }

    async fn generate(
        &self,
        model: &ModelId,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_request(request);
        debug!(model = %model, image = request.image.is_some(), "Gemini generateContent");

        let response = self
            .http
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(provider_error(Some(status.as_u16()), api_error_message(&text)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::Unexpected,
                format!("undecodable generateContent response: {e}"),
            )
        })?;
        parsed.into_text()
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut req = self
                .http
                .get(format!("{}/models", self.base_url))
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(ref token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let response = req.send().await.map_err(transport_error)?;
            let status = response.status();
            let text = response.text().await.map_err(transport_error)?;
            if !status.is_success() {
                return Err(provider_error(Some(status.as_u16()), api_error_message(&text)));
            }

            let page: ListModelsResponse = serde_json::from_str(&text).map_err(|e| {
                ProviderError::new(
                    ProviderErrorKind::Unexpected,
                    format!("undecodable model listing: {e}"),
                )
            })?;
            models.extend(page.models.into_iter().map(|m| ModelInfo {
                id: ModelId::new(m.name),
                supported_methods: m.supported_generation_methods,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        warn!("Model listing repeated page token {}, stopping", token);
                        break;
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        debug!("Gemini lists {} models", models.len());
        Ok(models)
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let kind = if e.is_timeout() || e.is_connect() || e.is_request() {
        ProviderErrorKind::Transport
    } else {
        ProviderErrorKind::Unexpected
    };
    ProviderError::new(kind, e.to_string())
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw
/// body when it is not the usual JSON envelope.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|env| match env.error.status {
            Some(status) => format!("{} [{}]", env.error.message, status),
            None => env.error.message,
        })
        .unwrap_or_else(|_| body.trim().to_string())
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        let mut parts = vec![Part {
            text: Some(request.prompt.clone()),
            inline_data: None,
        }];
        if let Some(ref image) = request.image {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                }),
            });
        }

        let generation_config =
            if request.temperature.is_some() || request.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                })
            } else {
                None
            };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_text(self) -> Result<String, ProviderError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = block_reason.unwrap_or_else(|| "no candidates returned".to_string());
            return Err(ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                format!("prompt blocked: {reason}"),
            ));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
            return Err(ProviderError::new(
                ProviderErrorKind::Unexpected,
                format!("empty response (finishReason: {reason})"),
            ));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}
