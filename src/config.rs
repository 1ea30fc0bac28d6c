//! Configuration for a review run.
//!
//! Every knob lives in [`ReviewConfig`], built through
//! [`ReviewConfigBuilder`]. The two credentials (API key, contact email) are
//! validated in [`ReviewConfigBuilder::build`], so a run never starts without
//! them.
//!
//! The library reads no environment variables: callers (such as the bundled
//! CLI) decide where credentials come from.

use crate::error::ReviewError;
use crate::progress::StageObserver;
use crate::provider::{gemini, GenerativeBackend, ModelId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default fixed model: fast, long context.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Last resort for the static-fallback strategy.
pub const DEFAULT_LAST_RESORT_MODEL: &str = "gemini-pro";

/// E-utilities root.
pub const DEFAULT_LITERATURE_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Literature text used when the id search comes back empty.
pub const DEFAULT_NO_RESULTS_SENTINEL: &str =
    "No recent related literature was found since the publication cutoff date.";

/// Configuration for one or more review runs.
///
/// # Example
/// ```rust
/// use manuscript_review::{ModelStrategy, ReviewConfig};
///
/// let config = ReviewConfig::builder()
///     .api_key("AIza...")
///     .contact_email("reviewer@example.org")
///     .model_strategy(ModelStrategy::live_discovery())
///     .max_literature_results(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Generative provider API key. Required.
    pub api_key: String,

    /// Contact email sent with every E-utilities request (NCBI usage
    /// policy). Required.
    pub contact_email: String,

    /// Provider name. `"gemini"` (default) uses the native REST backend;
    /// any other name is resolved through `edgequake-llm`.
    pub provider_name: String,

    /// Pre-built backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn GenerativeBackend>>,

    /// How the model identifier is chosen. Default: fixed `gemini-1.5-flash`.
    pub model_strategy: ModelStrategy,

    /// Corpus prefix (in characters) shown to the keyword stage. Default: 5 000.
    ///
    /// Keywords only need the title, abstract and opening of the methods.
    pub keyword_char_budget: usize,

    /// Corpus prefix (in characters) shown to the synthesis stage. Default: 20 000.
    pub report_char_budget: usize,

    /// Maximum PubMed ids fetched. Default: 5.
    pub max_literature_results: usize,

    /// Lower bound on publication date for the literature query.
    /// Default: 2024-01-01. The upper bound is open.
    pub publication_cutoff: NaiveDate,

    /// Literature text substituted when no recent article matches.
    pub no_results_sentinel: String,

    /// Pause after each image-description call, in milliseconds. Default: 1000.
    ///
    /// A throttle for provider rate limits, not a concurrency primitive.
    pub image_throttle_ms: u64,

    /// Sampling temperature. `None` keeps the provider default.
    pub temperature: Option<f32>,

    /// Output token cap per call. `None` keeps the provider default.
    pub max_output_tokens: Option<usize>,

    /// Per-call HTTP timeout for provider and literature requests. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Language the report is written in. Default: "English".
    pub report_language: String,

    /// Gemini API root. Override for proxies.
    pub provider_base_url: String,

    /// E-utilities root. Override for mirrors.
    pub literature_base_url: String,

    /// Stage/file event observer.
    pub observer: Option<Arc<dyn StageObserver>>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            contact_email: String::new(),
            provider_name: "gemini".to_string(),
            backend: None,
            model_strategy: ModelStrategy::default(),
            keyword_char_budget: 5_000,
            report_char_budget: 20_000,
            max_literature_results: 5,
            publication_cutoff: default_cutoff(),
            no_results_sentinel: DEFAULT_NO_RESULTS_SENTINEL.to_string(),
            image_throttle_ms: 1_000,
            temperature: None,
            max_output_tokens: None,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            report_language: "English".to_string(),
            provider_base_url: gemini::DEFAULT_BASE_URL.to_string(),
            literature_base_url: DEFAULT_LITERATURE_BASE_URL.to_string(),
            observer: None,
        }
    }
}

fn default_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("contact_email", &self.contact_email)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("model_strategy", &self.model_strategy)
            .field("keyword_char_budget", &self.keyword_char_budget)
            .field("report_char_budget", &self.report_char_budget)
            .field("max_literature_results", &self.max_literature_results)
            .field("publication_cutoff", &self.publication_cutoff)
            .field("image_throttle_ms", &self.image_throttle_ms)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("report_language", &self.report_language)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn StageObserver>"))
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }

    /// Cutoff in the `YYYY/MM/DD` form E-utilities expects.
    pub fn cutoff_query_date(&self) -> String {
        self.publication_cutoff.format("%Y/%m/%d").to_string()
    }

    /// Whether generation goes through the native Gemini backend, which
    /// needs the explicit API key.
    pub fn uses_native_gemini(&self) -> bool {
        self.backend.is_none() && matches!(self.provider_name.as_str(), "gemini" | "google")
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn contact_email(mut self, email: impl Into<String>) -> Self {
        self.config.contact_email = email.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn model_strategy(mut self, strategy: ModelStrategy) -> Self {
        self.config.model_strategy = strategy;
        self
    }

    /// Shorthand for `model_strategy(ModelStrategy::Fixed(..))`.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model_strategy = ModelStrategy::Fixed(ModelId::new(model));
        self
    }

    pub fn keyword_char_budget(mut self, chars: usize) -> Self {
        self.config.keyword_char_budget = chars;
        self
    }

    pub fn report_char_budget(mut self, chars: usize) -> Self {
        self.config.report_char_budget = chars;
        self
    }

    pub fn max_literature_results(mut self, n: usize) -> Self {
        self.config.max_literature_results = n;
        self
    }

    pub fn publication_cutoff(mut self, date: NaiveDate) -> Self {
        self.config.publication_cutoff = date;
        self
    }

    pub fn no_results_sentinel(mut self, text: impl Into<String>) -> Self {
        self.config.no_results_sentinel = text.into();
        self
    }

    pub fn image_throttle_ms(mut self, ms: u64) -> Self {
        self.config.image_throttle_ms = ms;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn report_language(mut self, language: impl Into<String>) -> Self {
        self.config.report_language = language.into();
        self
    }

    pub fn provider_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.provider_base_url = url.into();
        self
    }

    pub fn literature_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.literature_base_url = url.into();
        self
    }

    pub fn observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating credentials and budgets.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        // A pre-built backend carries its own credentials.
        if c.api_key.trim().is_empty() && c.uses_native_gemini() {
            return Err(ReviewError::MissingCredential {
                name: "API key",
                hint: "Pass the Gemini API key with ReviewConfig::builder().api_key(..).",
            });
        }
        if c.contact_email.trim().is_empty() {
            return Err(ReviewError::MissingCredential {
                name: "contact email",
                hint: "NCBI requires a contact email on every E-utilities request.",
            });
        }
        if c.keyword_char_budget == 0 || c.report_char_budget == 0 {
            return Err(ReviewError::InvalidConfig(
                "Character budgets must be ≥ 1".into(),
            ));
        }
        if c.max_literature_results == 0 {
            return Err(ReviewError::InvalidConfig(
                "max_literature_results must be ≥ 1".into(),
            ));
        }
        if let ModelStrategy::Fixed(ref id) = c.model_strategy {
            if id.as_str().trim().is_empty() {
                return Err(ReviewError::InvalidConfig("Fixed model id is empty".into()));
            }
        }
        Ok(self.config)
    }
}

// ── Model selection ──────────────────────────────────────────────────────

/// How a run picks its model identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelStrategy {
    /// Always this model; no resolution step, no substitution.
    Fixed(ModelId),
    /// First candidate the backend can bind, else `last_resort`.
    /// Later bindable candidates become substitution fallbacks.
    StaticFallback {
        candidates: Vec<ModelId>,
        last_resort: ModelId,
    },
    /// Ask the provider which models support generation and pick by marker.
    LiveDiscovery(DiscoveryMarkers),
}

impl Default for ModelStrategy {
    fn default() -> Self {
        ModelStrategy::Fixed(ModelId::new(DEFAULT_MODEL))
    }
}

impl ModelStrategy {
    /// The Gemini 1.5 preference list, flash first.
    pub fn static_fallback() -> Self {
        ModelStrategy::StaticFallback {
            candidates: vec![
                ModelId::new("gemini-1.5-flash"),
                ModelId::new("gemini-1.5-flash-latest"),
                ModelId::new("gemini-1.5-pro"),
                ModelId::new("gemini-pro"),
            ],
            last_resort: ModelId::new(DEFAULT_LAST_RESORT_MODEL),
        }
    }

    pub fn live_discovery() -> Self {
        ModelStrategy::LiveDiscovery(DiscoveryMarkers::default())
    }

    /// Whether the run needs a `ResolvingModel` step.
    pub fn needs_resolution(&self) -> bool {
        !matches!(self, ModelStrategy::Fixed(_))
    }
}

/// Substrings used to rank discovered models, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryMarkers {
    /// Fast/lightweight family. Default: `flash`.
    pub fast: String,
    /// Large-context v1.5 family. Default: `1.5-pro`.
    pub large_context: String,
    /// Generic default model. Default: `gemini-pro`.
    pub default: String,
}

impl Default for DiscoveryMarkers {
    fn default() -> Self {
        Self {
            fast: "flash".to_string(),
            large_context: "1.5-pro".to_string(),
            default: "gemini-pro".to_string(),
        }
    }
}

impl DiscoveryMarkers {
    /// Markers in the order they are tried.
    pub fn in_priority_order(&self) -> [&str; 3] {
        [&self.fast, &self.large_context, &self.default]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ReviewConfigBuilder {
        ReviewConfig::builder().api_key("key").contact_email("me@example.org")
    }

    #[test]
    fn defaults() {
        let c = valid().build().unwrap();
        assert_eq!(c.keyword_char_budget, 5_000);
        assert_eq!(c.report_char_budget, 20_000);
        assert_eq!(c.max_literature_results, 5);
        assert_eq!(c.cutoff_query_date(), "2024/01/01");
        assert_eq!(c.model_strategy, ModelStrategy::Fixed("gemini-1.5-flash".into()));
        assert!(!c.model_strategy.needs_resolution());
    }

    #[test]
    fn missing_api_key_is_precondition_failure() {
        let err = ReviewConfig::builder()
            .contact_email("me@example.org")
            .build()
            .unwrap_err();
        assert!(matches!(err, ReviewError::MissingCredential { name: "API key", .. }));
    }

    #[test]
    fn google_alias_also_needs_api_key() {
        let err = ReviewConfig::builder()
            .provider_name("google")
            .contact_email("me@example.org")
            .build()
            .unwrap_err();
        assert!(matches!(err, ReviewError::MissingCredential { name: "API key", .. }));
    }

    #[test]
    fn other_providers_bring_their_own_key() {
        let c = ReviewConfig::builder()
            .provider_name("openai")
            .contact_email("me@example.org")
            .build()
            .unwrap();
        assert!(!c.uses_native_gemini());
    }

    #[test]
    fn missing_email_is_precondition_failure() {
        let err = ReviewConfig::builder().api_key("k").build().unwrap_err();
        assert!(matches!(err, ReviewError::MissingCredential { name: "contact email", .. }));
    }

    #[test]
    fn zero_budget_rejected() {
        assert!(valid().keyword_char_budget(0).build().is_err());
        assert!(valid().max_literature_results(0).build().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let c = valid().api_key("AIzaSECRET").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("AIzaSECRET"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn cutoff_formatting() {
        let c = valid()
            .publication_cutoff(NaiveDate::from_ymd_opt(2023, 7, 4).unwrap())
            .build()
            .unwrap();
        assert_eq!(c.cutoff_query_date(), "2023/07/04");
    }

    #[test]
    fn discovery_marker_order() {
        let m = DiscoveryMarkers::default();
        assert_eq!(m.in_priority_order(), ["flash", "1.5-pro", "gemini-pro"]);
        assert!(ModelStrategy::live_discovery().needs_resolution());
        assert!(ModelStrategy::static_fallback().needs_resolution());
    }
}
