//! Observer trait for run, file and stage events.
//!
//! Inject an `Arc<dyn StageObserver>` via
//! [`crate::config::ReviewConfigBuilder::observer`] to receive events as the
//! orchestrator walks through its states.
//!
//! # Why an observer instead of returning progress?
//!
//! The orchestrator knows nothing about how the host presents work: a
//! terminal spinner, a web socket or a log line all hang off the same hooks.
//! Runs are sequential, so callbacks never fire concurrently within one run;
//! the trait is still `Send + Sync` so an observer can be shared between
//! independent runs.
//!
//! # Example
//!
//! ```rust
//! use manuscript_review::{ReviewConfig, Stage, StageObserver};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl StageObserver for Printer {
//!     fn on_stage_enter(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = ReviewConfig::builder()
//!     .api_key("key")
//!     .contact_email("me@example.org")
//!     .observer(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{Stage, StageFailure};

/// Called by the orchestrator as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait StageObserver: Send + Sync {
    /// Called once before the first file is extracted.
    ///
    /// # Arguments
    /// * `total_files`: number of uploads in this run
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is handed to its extractor.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in upload order
    /// * `name` : the upload's file name
    fn on_file_start(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called after a file has been turned into text.
    ///
    /// # Arguments
    /// * `index`   : 1-indexed position in upload order
    /// * `name`    : the upload's file name
    /// * `chars`   : length of the extracted text in characters
    /// * `degraded`: whether the text is a diagnostic or advisory placeholder
    fn on_file_extracted(&self, index: usize, name: &str, chars: usize, degraded: bool) {
        let _ = (index, name, chars, degraded);
    }

    /// Called when the orchestrator enters a stage.
    fn on_stage_enter(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// # Arguments
    /// * `stage`  : the stage that finished
    /// * `summary`: one-line description (chosen model, keywords, abstracts …)
    fn on_stage_result(&self, stage: Stage, summary: &str) {
        let _ = (stage, summary);
    }

    /// Called when a stage aborts the run, after its `on_stage_enter`.
    fn on_stage_failed(&self, failure: &StageFailure) {
        let _ = failure;
    }

    /// Called once when the run reaches `Done` or `Failed`.
    fn on_run_complete(&self, success: bool) {
        let _ = success;
    }
}

/// The observer used when none is configured.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}
