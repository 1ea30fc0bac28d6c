//! Error types for the manuscript-review library.
//!
//! Three distinct failure modes, three distinct representations:
//!
//! * [`ReviewError`]: fatal, the run cannot continue (bad configuration,
//!   no usable model, a generation call that failed for a non-substitutable
//!   reason). Surfaced through [`crate::output::PipelineResult::Failure`] or
//!   returned as `Err` from helpers such as input loading.
//!
//! * [`ProviderError`]: a single provider call failed. Every provider
//!   adapter maps its raw failure into one of these through
//!   [`crate::provider::classify`], so the retry policy in
//!   [`crate::generation`] only ever looks at [`ProviderErrorKind`].
//!
//! * Degraded content: an unreadable file or an unreachable literature
//!   database is *not* an error at all. Those cases become text
//!   ([`crate::pipeline::extract::Extracted`], the literature string) and the
//!   run carries on.

use crate::output::StageFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the manuscript-review library.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// A required credential was not supplied before the run.
    #[error("Missing credential: {name}\n{hint}")]
    MissingCredential { name: &'static str, hint: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Model resolution ──────────────────────────────────────────────────
    /// Live discovery found no model supporting content generation.
    #[error("No generative models available: {cause}")]
    NoModelsAvailable { cause: String },

    /// The candidate list handed to the generation client was empty.
    #[error("No candidate models to try")]
    NoCandidateModels,

    // ── Generation ────────────────────────────────────────────────────────
    /// A candidate failed with a non-substitutable error (auth, quota,
    /// malformed request), or the only candidate failed.
    #[error("Model '{model}' failed: {source}")]
    Generation {
        model: String,
        #[source]
        source: ProviderError,
    },

    /// Every candidate failed with a retryable error.
    #[error("All {attempted} candidate models unavailable. Last error: {last_error}")]
    AllModelsExhausted {
        attempted: usize,
        last_error: ProviderError,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pipeline ──────────────────────────────────────────────────────────
    /// A run ended in `Failed(stage)`; see [`crate::output::PipelineResult::into_result`].
    #[error("{0}")]
    StageFailed(StageFailure),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    /// The model involved in the failure, when there is one.
    pub fn model(&self) -> Option<&str> {
        match self {
            ReviewError::Generation { model, .. } => Some(model),
            ReviewError::StageFailed(failure) => failure.model.as_deref(),
            _ => None,
        }
    }
}

/// Classification of a failed provider call.
///
/// Only [`ModelNotFound`](Self::ModelNotFound) and
/// [`Unavailable`](Self::Unavailable) let the generation client move on to
/// the next candidate model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The model identifier is unknown or invalid for this provider.
    ModelNotFound,
    /// The model exists but is overloaded or temporarily down.
    Unavailable,
    /// Bad or missing API key, or permission denied.
    Authentication,
    /// Quota or rate limit exhausted.
    Quota,
    /// The provider rejected the request body.
    InvalidRequest,
    /// Network-level failure before a response was received.
    Transport,
    /// The provider answered but the response could not be understood.
    Unexpected,
}

impl ProviderErrorKind {
    /// Whether the failure should trigger a substitution of the next model.
    pub fn is_retryable(self) -> bool {
        matches!(self, ProviderErrorKind::ModelNotFound | ProviderErrorKind::Unavailable)
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::ModelNotFound => "model not found",
            ProviderErrorKind::Unavailable => "model unavailable",
            ProviderErrorKind::Authentication => "authentication failed",
            ProviderErrorKind::Quota => "quota exceeded",
            ProviderErrorKind::InvalidRequest => "invalid request",
            ProviderErrorKind::Transport => "transport error",
            ProviderErrorKind::Unexpected => "unexpected response",
        };
        f.write_str(s)
    }
}

/// A classified failure of one provider call.
///
/// `message` is the raw provider text, kept verbatim for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ProviderErrorKind::ModelNotFound.is_retryable());
        assert!(ProviderErrorKind::Unavailable.is_retryable());
        assert!(!ProviderErrorKind::Authentication.is_retryable());
        assert!(!ProviderErrorKind::Quota.is_retryable());
        assert!(!ProviderErrorKind::InvalidRequest.is_retryable());
        assert!(!ProviderErrorKind::Transport.is_retryable());
    }

    #[test]
    fn provider_error_display_includes_status() {
        let e = ProviderError::new(ProviderErrorKind::Unavailable, "The model is overloaded.")
            .with_status(503);
        let msg = e.to_string();
        assert!(msg.contains("HTTP 503"), "got: {msg}");
        assert!(msg.contains("overloaded"), "got: {msg}");
    }

    #[test]
    fn provider_error_display_without_status() {
        let e = ProviderError::new(ProviderErrorKind::Transport, "connection reset");
        assert_eq!(e.to_string(), "transport error: connection reset");
    }

    #[test]
    fn generation_error_names_model() {
        let e = ReviewError::Generation {
            model: "gemini-1.5-flash".into(),
            source: ProviderError::new(ProviderErrorKind::Authentication, "API key not valid"),
        };
        assert_eq!(e.model(), Some("gemini-1.5-flash"));
        assert!(e.to_string().contains("API key not valid"));
    }

    #[test]
    fn exhausted_display() {
        let e = ReviewError::AllModelsExhausted {
            attempted: 3,
            last_error: ProviderError::new(ProviderErrorKind::ModelNotFound, "404"),
        };
        assert!(e.to_string().contains("All 3 candidate"));
    }
}
