//! # manuscript-review
//!
//! Turn a manuscript bundle (main text, cover letter, figures) into a
//! peer-review report grounded in recent PubMed literature.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (PDF, Word, images)
//!  │
//!  ├─ 1. Resolve  pick the model once: fixed, static fallback or live discovery
//!  ├─ 2. Extract  PDF text layer, docx paragraphs, figure descriptions
//!  ├─ 3. Merge    "--- File: <name> ---" delimited corpus, upload order
//!  ├─ 4. Keywords first 5 000 chars → 3-5 MeSH terms
//!  ├─ 5. PubMed   newest abstracts since the cutoff date (advisory)
//!  └─ 6. Report   first 20 000 chars + abstracts → structured review
//! ```
//!
//! Extraction and literature problems never abort a run; they become text in
//! the corpus or in place of the abstracts. Resolution, keyword and report
//! failures end the run with a [`PipelineResult::Failure`] naming the stage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use manuscript_review::{review_files, ModelStrategy, ReviewConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReviewConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .contact_email("reviewer@example.org")
//!         .model_strategy(ModelStrategy::static_fallback())
//!         .build()?;
//!
//!     let result = review_files(&["paper.pdf", "fig1.tif"], &config).await?;
//!     let report = result.into_result()?;
//!     println!("{}", report.text);
//!     eprintln!("verdict: {:?}", report.recommendation());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `review-assist` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! manuscript-review = { version = "0.3", default-features = false }
//! ```
//!
//! ## Providers
//!
//! Gemini is served by a native REST backend with explicit credentials and
//! live model discovery. Any other `provider_name` is handed to
//! `edgequake-llm` (OpenAI, Anthropic, Mistral, Ollama …), which reads its own
//! key variables and cannot list models.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod resolver;
pub mod review;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DiscoveryMarkers, ModelStrategy, ReviewConfig, ReviewConfigBuilder};
pub use corpus::{Corpus, CorpusFragment, UploadedFile};
pub use error::{ProviderError, ProviderErrorKind, ReviewError};
pub use generation::{Generated, GenerationClient};
pub use output::{
    write_report, PipelineResult, PipelineState, Recommendation, ReviewReport, Stage,
    StageFailure, REPORT_FILE_NAME,
};
pub use pipeline::extract::Extracted;
pub use pipeline::literature::{LiteratureSource, PubMedClient};
pub use progress::{NoopObserver, StageObserver};
pub use provider::{GenerationRequest, GenerativeBackend, ImagePart, ModelId, ModelInfo};
pub use resolver::{ModelResolver, ModelSelection};
pub use review::{
    check_connection, review, review_corpus, review_files, review_sync, review_with,
    ConnectionReport,
};
