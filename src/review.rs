//! Review orchestration: uploads in, report (or a tagged failure) out.
//!
//! ## Flow
//!
//! ```text
//! Idle ─▶ [ResolvingModel] ─▶ extract uploads ─▶ ExtractingKeywords
//!      ─▶ SearchingLiterature ─▶ SynthesizingReport ─▶ Done
//! ```
//!
//! The model is resolved once, before extraction, because figure
//! descriptions already need it. The same [`ModelSelection`] then serves
//! every generation call of the run, so live discovery cannot hand the
//! keyword stage and the synthesis stage different models.
//!
//! Extraction and literature problems turn into text and never stop a run.
//! Resolution, keyword and synthesis failures end it in
//! [`PipelineResult::Failure`] with the stage and the provider's message.
//!
//! Every call builds its own backend, resolver, client and state; nothing
//! is shared between runs.

use crate::config::ReviewConfig;
use crate::corpus::{truncate_chars, Corpus, CorpusFragment, UploadedFile};
use crate::error::ReviewError;
use crate::generation::GenerationClient;
use crate::output::{PipelineResult, PipelineState, ReviewReport, Stage, StageFailure};
use crate::pipeline::extract::extract;
use crate::pipeline::image::ImageDescriber;
use crate::pipeline::input;
use crate::pipeline::literature::{LiteratureSearcher, LiteratureSource, PubMedClient};
use crate::pipeline::postprocess::{clean_report, normalise_keywords};
use crate::progress::{NoopObserver, StageObserver};
use crate::prompts;
use crate::provider::{backend_for, GenerationRequest, GenerativeBackend, ModelId};
use crate::resolver::{ModelResolver, ModelSelection};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

static NOOP: NoopObserver = NoopObserver;

/// Review a set of uploads.
///
/// This is the primary entry point for the library. It never returns an
/// error: every fatal problem is a [`PipelineResult::Failure`].
///
/// # Example
/// ```rust,no_run
/// use manuscript_review::{review, ReviewConfig, UploadedFile};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReviewConfig::builder()
///     .api_key(std::env::var("GEMINI_API_KEY")?)
///     .contact_email("reviewer@example.org")
///     .build()?;
/// let files = vec![UploadedFile::new("paper.pdf", std::fs::read("paper.pdf")?)];
/// let report = review(&files, &config).await.into_result()?;
/// println!("{}", report.text);
/// # Ok(())
/// # }
/// ```
pub async fn review(files: &[UploadedFile], config: &ReviewConfig) -> PipelineResult {
    match PubMedClient::from_config(config) {
        Ok(pubmed) => review_with(files, config, &pubmed).await,
        Err(e) => early_failure(config, &e),
    }
}

/// [`review`] with a caller-supplied literature source.
pub async fn review_with(
    files: &[UploadedFile],
    config: &ReviewConfig,
    literature: &dyn LiteratureSource,
) -> PipelineResult {
    match backend_for(config) {
        Ok(backend) => {
            Run::new(config, backend.as_ref(), literature)
                .execute(Source::Uploads(files))
                .await
        }
        Err(e) => early_failure(config, &e),
    }
}

/// Review an already-built corpus; no extraction step.
pub async fn review_corpus(corpus: &Corpus, config: &ReviewConfig) -> PipelineResult {
    let pubmed = match PubMedClient::from_config(config) {
        Ok(p) => p,
        Err(e) => return early_failure(config, &e),
    };
    match backend_for(config) {
        Ok(backend) => {
            Run::new(config, backend.as_ref(), &pubmed)
                .execute(Source::Corpus(corpus))
                .await
        }
        Err(e) => early_failure(config, &e),
    }
}

/// Load paths or URLs, then review them.
///
/// # Errors
/// Only input loading errors; the review itself reports through the result.
pub async fn review_files<S: AsRef<str>>(
    inputs: &[S],
    config: &ReviewConfig,
) -> Result<PipelineResult, ReviewError> {
    let files = input::load_uploads(inputs, config.download_timeout_secs).await?;
    Ok(review(&files, config).await)
}

/// Synchronous wrapper around [`review`].
///
/// Creates a temporary tokio runtime internally.
pub fn review_sync(
    files: &[UploadedFile],
    config: &ReviewConfig,
) -> Result<PipelineResult, ReviewError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReviewError::Internal(format!("Failed to create tokio runtime: {}", e)))
        .map(|rt| rt.block_on(review(files, config)))
}

/// A failure before any stage could run (backend or HTTP client setup).
fn early_failure(config: &ReviewConfig, err: &ReviewError) -> PipelineResult {
    warn!("Run could not start: {}", err);
    let observer = config.observer.as_deref().unwrap_or(&NOOP);
    let failure = StageFailure::from_error(Stage::ModelResolution, err);
    observer.on_stage_enter(Stage::ModelResolution);
    observer.on_stage_failed(&failure);
    observer.on_run_complete(false);
    PipelineResult::Failure(failure)
}

// ── One run ──────────────────────────────────────────────────────────────

enum Source<'a> {
    Uploads(&'a [UploadedFile]),
    Corpus(&'a Corpus),
}

/// Per-run state. Created at `Idle`, dropped at `Done`/`Failed`.
struct Run<'a> {
    config: &'a ReviewConfig,
    backend: &'a dyn GenerativeBackend,
    literature: &'a dyn LiteratureSource,
    observer: &'a dyn StageObserver,
    state: PipelineState,
}

impl<'a> Run<'a> {
    fn new(
        config: &'a ReviewConfig,
        backend: &'a dyn GenerativeBackend,
        literature: &'a dyn LiteratureSource,
    ) -> Self {
        Self {
            config,
            backend,
            literature,
            observer: config.observer.as_deref().unwrap_or(&NOOP),
            state: PipelineState::Idle,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} → {:?}",
            self.state,
            next
        );
        debug!("{:?} → {:?}", self.state, next);
        self.state = next;
        if let Some(stage) = next.stage() {
            self.observer.on_stage_enter(stage);
        }
    }

    fn fail(&mut self, stage: Stage, failure: StageFailure) -> PipelineResult {
        warn!("{}", failure);
        self.enter(PipelineState::Failed(stage));
        self.observer.on_stage_failed(&failure);
        self.observer.on_run_complete(false);
        PipelineResult::Failure(failure)
    }

    async fn execute(mut self, source: Source<'_>) -> PipelineResult {
        let start = Instant::now();
        let client = GenerationClient::new(self.backend);

        // ── Step 1: Resolve the model once for the whole run ─────────────
        let selection = match self.resolve().await {
            Ok(selection) => selection,
            Err(e) => {
                let failure = StageFailure::from_error(Stage::ModelResolution, &e);
                return self.fail(Stage::ModelResolution, failure);
            }
        };
        let candidates = selection.candidates();

        // ── Step 2: Build the corpus ─────────────────────────────────────
        let corpus = match source {
            Source::Uploads(files) => self.build_corpus(files, &client, &candidates).await,
            Source::Corpus(corpus) => corpus.clone(),
        };
        let corpus_text = corpus.text();
        info!(
            "Corpus: {} fragment(s), {} chars",
            corpus.fragments().len(),
            corpus_text.chars().count()
        );

        // ── Step 3: Keywords ─────────────────────────────────────────────
        self.enter(PipelineState::ExtractingKeywords);
        let excerpt = truncate_chars(&corpus_text, self.config.keyword_char_budget);
        let request = GenerationRequest::text(prompts::keyword_prompt(excerpt)).tuned(self.config);
        let keywords = match client.generate(&request, &candidates).await {
            Ok(generated) => normalise_keywords(&generated.text),
            Err(e) => {
                let failure = stage_failure(Stage::KeywordExtraction, &e, &selection.primary);
                return self.fail(Stage::KeywordExtraction, failure);
            }
        };
        info!("Keywords: {}", keywords);
        self.observer.on_stage_result(Stage::KeywordExtraction, &keywords);

        // ── Step 4: Literature (advisory, cannot fail) ───────────────────
        self.enter(PipelineState::SearchingLiterature);
        let literature = LiteratureSearcher::new(self.literature, self.config)
            .search(&keywords, self.config.max_literature_results)
            .await;
        let summary = literature_summary(&literature, self.config);
        self.observer.on_stage_result(Stage::LiteratureSearch, &summary);

        // ── Step 5: Report ───────────────────────────────────────────────
        self.enter(PipelineState::SynthesizingReport);
        let excerpt = truncate_chars(&corpus_text, self.config.report_char_budget);
        let prompt = prompts::review_prompt(excerpt, &literature, &self.config.report_language);
        let request = GenerationRequest::text(prompt).tuned(self.config);
        let generated = match client.generate(&request, &candidates).await {
            Ok(generated) => generated,
            Err(e) => {
                let failure = stage_failure(Stage::ReportSynthesis, &e, &selection.primary);
                return self.fail(Stage::ReportSynthesis, failure);
            }
        };
        self.observer.on_stage_result(
            Stage::ReportSynthesis,
            &format!("{} chars from {}", generated.text.chars().count(), generated.model),
        );

        // ── Step 6: Done ─────────────────────────────────────────────────
        self.enter(PipelineState::Done);
        self.observer.on_run_complete(true);
        info!("Review finished in {}ms", start.elapsed().as_millis());

        PipelineResult::Success(ReviewReport {
            text: clean_report(&generated.text),
            keywords,
            literature,
            model: generated.model.to_string(),
        })
    }

    /// Resolve the strategy. The fixed strategy skips `ResolvingModel`.
    async fn resolve(&mut self) -> Result<ModelSelection, ReviewError> {
        let config = self.config;
        let strategy = &config.model_strategy;
        let resolver = ModelResolver::new(self.backend, strategy);
        if !strategy.needs_resolution() {
            return resolver.resolve().await;
        }

        self.enter(PipelineState::ResolvingModel);
        let selection = resolver.resolve().await?;
        self.observer.on_stage_result(
            Stage::ModelResolution,
            &format!("{} ({} fallback(s))", selection.primary, selection.fallbacks.len()),
        );
        Ok(selection)
    }

    async fn build_corpus(
        &self,
        files: &[UploadedFile],
        client: &GenerationClient<'_>,
        candidates: &[ModelId],
    ) -> Corpus {
        self.observer.on_run_start(files.len());
        let describer = ImageDescriber::new(client, candidates, self.config);

        let mut corpus = Corpus::new();
        for (idx, file) in files.iter().enumerate() {
            self.observer.on_file_start(idx + 1, &file.name);
            let extracted = extract(file, &describer).await;
            let degraded = extracted.is_degraded();
            if degraded {
                warn!("{}: {}", file.name, extracted.text());
            }
            let text = extracted.into_text();
            self.observer
                .on_file_extracted(idx + 1, &file.name, text.chars().count(), degraded);
            corpus.push(CorpusFragment::new(file.label(), text));
        }
        corpus
    }
}

/// Stage failure for a generation stage; names the primary model when the
/// error itself carries none (exhaustion).
fn stage_failure(stage: Stage, err: &ReviewError, primary: &ModelId) -> StageFailure {
    let mut failure = StageFailure::from_error(stage, err);
    failure.model.get_or_insert_with(|| primary.to_string());
    failure
}

fn literature_summary(literature: &str, config: &ReviewConfig) -> String {
    if literature == config.no_results_sentinel {
        "no recent results".to_string()
    } else {
        format!("{} chars of abstracts", literature.chars().count())
    }
}

// ── Connection check ─────────────────────────────────────────────────────

/// Outcome of [`check_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub provider: String,
    /// Models supporting generation, when the provider can list them.
    pub generative_models: Option<Vec<String>>,
    /// Model that answered the test prompt.
    pub model: String,
    pub reply: String,
}

/// Smoke-test the credentials: list models (when supported), then make one
/// trivial generation call with the configured strategy.
pub async fn check_connection(config: &ReviewConfig) -> Result<ConnectionReport, ReviewError> {
    let backend = backend_for(config)?;

    let generative_models = match backend.list_models().await {
        Ok(models) => Some(
            models
                .into_iter()
                .filter(|m| m.supports_generation())
                .map(|m| m.id.to_string())
                .collect(),
        ),
        Err(e) => {
            debug!("Model listing unavailable: {}", e);
            None
        }
    };

    let selection = ModelResolver::new(backend.as_ref(), &config.model_strategy)
        .resolve()
        .await?;
    let generated = GenerationClient::new(backend.as_ref())
        .generate(
            &GenerationRequest::text("Reply with the single word OK."),
            &selection.candidates(),
        )
        .await?;

    Ok(ConnectionReport {
        provider: backend.name().to_string(),
        generative_models,
        model: generated.model.to_string(),
        reply: generated.text.trim().to_string(),
    })
}
