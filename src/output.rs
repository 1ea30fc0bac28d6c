//! Output types: stage tags, run states, results and the report artefact.

use crate::error::ReviewError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Fixed file name for a downloaded report.
pub const REPORT_FILE_NAME: &str = "review_report.txt";

// ── Stages and states ────────────────────────────────────────────────────

/// A pipeline stage that can fail the run or report a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ModelResolution,
    KeywordExtraction,
    LiteratureSearch,
    ReportSynthesis,
}

impl Stage {
    /// Whether a failure in this stage aborts the run.
    ///
    /// Literature search is advisory: its errors become content.
    pub fn can_fail(self) -> bool {
        !matches!(self, Stage::LiteratureSearch)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ModelResolution => "model resolution",
            Stage::KeywordExtraction => "keyword extraction",
            Stage::LiteratureSearch => "literature search",
            Stage::ReportSynthesis => "report synthesis",
        };
        f.write_str(s)
    }
}

/// Orchestrator state.
///
/// ```text
/// Idle ─▶ [ResolvingModel] ─▶ ExtractingKeywords ─▶ SearchingLiterature ─▶ SynthesizingReport ─▶ Done
///               │                    │                                            │
///               └────────────────────┴──────────────▶ Failed(stage) ◀─────────────┘
/// ```
///
/// `ResolvingModel` is skipped for the fixed-model strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    ResolvingModel,
    ExtractingKeywords,
    SearchingLiterature,
    SynthesizingReport,
    Done,
    Failed(Stage),
}

impl PipelineState {
    /// The stage that runs in this state, if any.
    pub fn stage(self) -> Option<Stage> {
        match self {
            PipelineState::ResolvingModel => Some(Stage::ModelResolution),
            PipelineState::ExtractingKeywords => Some(Stage::KeywordExtraction),
            PipelineState::SearchingLiterature => Some(Stage::LiteratureSearch),
            PipelineState::SynthesizingReport => Some(Stage::ReportSynthesis),
            _ => None,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, ResolvingModel) | (Idle, ExtractingKeywords) => true,
            (ResolvingModel, ExtractingKeywords) => true,
            (ExtractingKeywords, SearchingLiterature) => true,
            (SearchingLiterature, SynthesizingReport) => true,
            (SynthesizingReport, Done) => true,
            (from, Failed(stage)) => {
                stage.can_fail() && from.stage() == Some(stage)
            }
            _ => false,
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// Why and where a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    /// Model that was serving the stage, when one had been chosen.
    pub model: Option<String>,
    /// Underlying error, including the raw provider message.
    pub detail: String,
}

impl StageFailure {
    pub fn from_error(stage: Stage, err: &ReviewError) -> Self {
        Self {
            stage,
            model: err.model().map(str::to_string),
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.stage)?;
        if let Some(ref model) = self.model {
            write!(f, " (model {model})")?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// The product of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// Final report text (markdown emphasis allowed).
    pub text: String,
    /// Keywords sent to the literature search.
    pub keywords: String,
    /// Literature text given to the synthesis stage: abstracts, the
    /// no-results sentinel, or an advisory error string.
    pub literature: String,
    /// Model that wrote the report.
    pub model: String,
}

/// Editorial verdict requested at the end of every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Accept => "Accept",
            Recommendation::MinorRevision => "Minor Revision",
            Recommendation::MajorRevision => "Major Revision",
            Recommendation::Reject => "Reject",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static RE_BOLD_VERDICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\*\*\s*(accept|minor\s+revision|major\s+revision|reject)\s*\*\*").unwrap()
});

impl ReviewReport {
    /// The first bolded verdict in the report.
    ///
    /// Only bolded labels count: plain "reject" appears in ordinary prose.
    pub fn recommendation(&self) -> Option<Recommendation> {
        let caps = RE_BOLD_VERDICT.captures(&self.text)?;
        let word = caps[1].to_lowercase();
        Some(if word == "accept" {
            Recommendation::Accept
        } else if word == "reject" {
            Recommendation::Reject
        } else if word.starts_with("minor") {
            Recommendation::MinorRevision
        } else {
            Recommendation::MajorRevision
        })
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Success(ReviewReport),
    Failure(StageFailure),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    pub fn report(&self) -> Option<&ReviewReport> {
        match self {
            PipelineResult::Success(r) => Some(r),
            PipelineResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            PipelineResult::Success(_) => None,
            PipelineResult::Failure(f) => Some(f),
        }
    }

    /// Convert into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<ReviewReport, ReviewError> {
        match self {
            PipelineResult::Success(r) => Ok(r),
            PipelineResult::Failure(f) => Err(ReviewError::StageFailed(f)),
        }
    }
}

// ── Report artefact ──────────────────────────────────────────────────────

/// Write the report text to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_report(
    path: impl AsRef<Path>,
    report: &ReviewReport,
) -> Result<(), ReviewError> {
    let path = path.as_ref();
    let fail = |source| ReviewError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, &report.text).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;

    info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(text: &str) -> ReviewReport {
        ReviewReport {
            text: text.to_string(),
            keywords: "sepsis biomarkers".into(),
            literature: "none".into(),
            model: "gemini-1.5-flash".into(),
        }
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use PipelineState::*;
        assert!(Idle.can_transition_to(ResolvingModel));
        assert!(Idle.can_transition_to(ExtractingKeywords));
        assert!(ExtractingKeywords.can_transition_to(SearchingLiterature));
        assert!(SynthesizingReport.can_transition_to(Done));

        assert!(ResolvingModel.can_transition_to(Failed(Stage::ModelResolution)));
        assert!(ExtractingKeywords.can_transition_to(Failed(Stage::KeywordExtraction)));
        assert!(SynthesizingReport.can_transition_to(Failed(Stage::ReportSynthesis)));

        assert!(!SearchingLiterature.can_transition_to(Failed(Stage::LiteratureSearch)));
        assert!(!ExtractingKeywords.can_transition_to(Failed(Stage::ReportSynthesis)));
        assert!(!Done.can_transition_to(Idle));
        assert!(!Idle.can_transition_to(SearchingLiterature));
        assert!(!Failed(Stage::ReportSynthesis).can_transition_to(Done));
    }

    #[test]
    fn recommendation_finds_first_bold_verdict() {
        let r = report("## Recommendation\n\n**Major Revision**\n\nNot **Reject**.");
        assert_eq!(r.recommendation(), Some(Recommendation::MajorRevision));

        let r = report("We reject nothing. Verdict: ** minor revision **");
        assert_eq!(r.recommendation(), Some(Recommendation::MinorRevision));

        assert_eq!(report("We could not reject H0.").recommendation(), None);
    }

    #[test]
    fn failure_converts_to_error() {
        let failure = StageFailure {
            stage: Stage::KeywordExtraction,
            model: Some("gemini-pro".into()),
            detail: "API key not valid".into(),
        };
        assert_eq!(
            failure.to_string(),
            "keyword extraction failed (model gemini-pro): API key not valid"
        );

        let err = PipelineResult::Failure(failure).into_result().unwrap_err();
        assert!(matches!(
            err,
            ReviewError::StageFailed(ref f) if f.stage == Stage::KeywordExtraction
        ));
    }

    #[test]
    fn result_serialises_with_status_tag() {
        let json = serde_json::to_value(PipelineResult::Success(report("ok"))).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["model"], "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn write_report_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join(REPORT_FILE_NAME);
        write_report(&path, &report("# Review\n")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Review\n");
        assert!(!path.with_extension("txt.tmp").exists());
    }
}
