//! CLI binary for manuscript-review.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReviewConfig` and prints the report.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use manuscript_review::{
    check_connection, review_files, write_report, ModelStrategy, PipelineResult, ReviewConfig,
    Stage, StageFailure, StageObserver, REPORT_FILE_NAME,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];
const BAR_TEMPLATE: &str = "{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}";

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner for the current step plus one log line per
/// extracted file and per finished stage.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StageObserver for CliObserver {
    fn on_run_start(&self, total_files: usize) {
        self.bar.set_prefix("Extracting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_extracted(&self, index: usize, name: &str, chars: usize, degraded: bool) {
        let mark = if degraded { cyan("⚠") } else { green("✓") };
        self.bar.println(format!(
            "  {} {:>2}. {:<32}  {}",
            mark,
            index,
            name,
            dim(&format!("{chars:>6} chars")),
        ));
    }

    fn on_stage_enter(&self, stage: Stage) {
        self.bar.set_prefix(capitalise(&stage.to_string()));
        self.bar.set_message("");
    }

    fn on_stage_result(&self, stage: Stage, summary: &str) {
        self.bar.println(format!(
            "  {} {}: {}",
            green("✓"),
            stage,
            dim(&truncate(summary, 80))
        ));
    }

    fn on_stage_failed(&self, failure: &StageFailure) {
        self.bar.println(format!(
            "  {} {}: {}",
            red("✗"),
            failure.stage,
            red(&failure.detail)
        ));
    }

    fn on_run_complete(&self, success: bool) {
        self.bar.finish_and_clear();
        if success {
            eprintln!("{} {}", green("✔"), bold("Review complete"));
        } else {
            eprintln!("{} {}", red("✘"), bold("Review failed"));
        }
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review a manuscript and its figures (report on stdout)
  review-assist paper.pdf cover_letter.docx fig1.tif

  # Save to review_report.txt
  review-assist paper.pdf -o

  # Save to a chosen file, report in Spanish
  review-assist paper.pdf --output=informe.txt --language Spanish

  # Let the provider say which models are available
  review-assist --strategy discover paper.pdf

  # Review a preprint straight from a URL
  review-assist https://example.org/preprint.pdf

  # Check credentials and model access, then exit
  review-assist --check

  # JSON output (PipelineResult: status, report or failure)
  review-assist --json paper.pdf > result.json

MODEL STRATEGIES:
  fixed      Use --model as-is (default: gemini-1.5-flash)
  static     Try gemini-1.5-flash, -flash-latest, 1.5-pro, gemini-pro;
             fall through to the next on "model not found"
  discover   List the provider's generative models; prefer flash,
             then 1.5-pro, then gemini-pro, then the first listed

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  NCBI_EMAIL              Contact e-mail sent with PubMed requests
  REVIEW_PROVIDER         Generation provider (default: gemini)
  REVIEW_MODEL            Model ID for the fixed strategy
  RUST_LOG                Override the log filter (e.g. manuscript_review=debug)

  Non-Gemini providers (openai, anthropic, mistral, ollama) read their own
  key variables, e.g. OPENAI_API_KEY.
"#;

/// Review a manuscript bundle against recent PubMed literature.
#[derive(Parser, Debug)]
#[command(
    name = "review-assist",
    version,
    about = "Draft a peer-review report for a manuscript bundle using Gemini and PubMed",
    long_about = "Extract text from PDF and Word files and descriptions from figures, \
derive MeSH keywords, fetch recent PubMed abstracts and draft a structured peer-review \
report (General Comments, Reality Check, Queries for Authors, Recommendation).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local files or HTTP/HTTPS URLs, in upload order.
    #[arg(required_unless_present = "check")]
    inputs: Vec<String>,

    /// Write the report to a file instead of stdout: bare `-o` writes
    /// review_report.txt, `--output=<file>` picks the name.
    #[arg(
        short,
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = REPORT_FILE_NAME
    )]
    output: Option<PathBuf>,

    /// Generative model API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Contact e-mail for PubMed (NCBI) requests.
    #[arg(long, env = "NCBI_EMAIL", default_value = "")]
    email: String,

    /// Generation provider: gemini, openai, anthropic, mistral, ollama.
    #[arg(long, env = "REVIEW_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model ID for the fixed strategy.
    #[arg(long, env = "REVIEW_MODEL")]
    model: Option<String>,

    /// How the model is chosen: fixed, static, discover.
    #[arg(long, value_enum, default_value = "fixed")]
    strategy: StrategyArg,

    /// Corpus characters sent for keyword extraction.
    #[arg(long, default_value_t = 5000)]
    keyword_chars: usize,

    /// Corpus characters sent for report synthesis.
    #[arg(long, default_value_t = 20000)]
    report_chars: usize,

    /// Maximum PubMed abstracts to fetch.
    #[arg(long, default_value_t = 5)]
    max_results: usize,

    /// Only literature published on or after this date (YYYY-MM-DD).
    #[arg(long, default_value = "2024-01-01", value_parser = parse_date)]
    since: NaiveDate,

    /// Language of the report.
    #[arg(long, default_value = "English")]
    language: String,

    /// Pause after each figure description, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    image_throttle_ms: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long)]
    temperature: Option<f32>,

    /// Print the full PipelineResult as JSON.
    #[arg(long)]
    json: bool,

    /// Check credentials and model access, then exit.
    #[arg(long)]
    check: bool,

    /// Disable progress output.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Generation call timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    Fixed,
    Static,
    Discover,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would interleave with the spinner; keep them for
    // runs without progress output.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let observer = if show_progress && !cli.check {
        Some(CliObserver::new() as Arc<dyn StageObserver>)
    } else {
        None
    };
    let config = build_config(&cli, observer)?;

    // ── Connection check ─────────────────────────────────────────────────
    if cli.check {
        let report = check_connection(&config)
            .await
            .context("Connection check failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            println!("Provider:  {}", report.provider);
            match report.generative_models {
                Some(ref models) => println!("Models:    {}", models.join(", ")),
                None => println!("Models:    (listing not supported)"),
            }
            println!("Answered:  {} → {:?}", report.model, report.reply);
        }
        return Ok(());
    }

    // ── Run review ───────────────────────────────────────────────────────
    let result = review_files(&cli.inputs, &config)
        .await
        .context("Failed to load inputs")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
        if !result.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let report = match result {
        PipelineResult::Success(report) => report,
        PipelineResult::Failure(failure) => {
            anyhow::bail!("{failure}");
        }
    };

    if let Some(ref path) = cli.output {
        write_report(path, &report)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("   report  →  {}", bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.text.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        eprintln!("   keywords   {}", dim(&report.keywords));
        eprintln!("   model      {}", dim(&report.model));
        if let Some(verdict) = report.recommendation() {
            eprintln!("   verdict    {}", bold(verdict.label()));
        }
    }

    Ok(())
}

/// Map CLI args to `ReviewConfig`.
fn build_config(cli: &Cli, observer: Option<Arc<dyn StageObserver>>) -> Result<ReviewConfig> {
    let strategy = match cli.strategy {
        StrategyArg::Fixed => None,
        StrategyArg::Static => Some(ModelStrategy::static_fallback()),
        StrategyArg::Discover => Some(ModelStrategy::live_discovery()),
    };

    let mut builder = ReviewConfig::builder()
        .api_key(cli.api_key.trim())
        .contact_email(cli.email.trim())
        .provider_name(cli.provider.trim())
        .keyword_char_budget(cli.keyword_chars)
        .report_char_budget(cli.report_chars)
        .max_literature_results(cli.max_results)
        .publication_cutoff(cli.since)
        .report_language(cli.language.trim())
        .image_throttle_ms(cli.image_throttle_ms)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.trim());
    }
    if let Some(strategy) = strategy {
        if cli.model.is_some() {
            eprintln!("{} --model is ignored with --strategy {:?}", cyan("⚠"), cli.strategy);
        }
        builder = builder.model_strategy(strategy);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(obs) = observer {
        builder = builder.observer(obs);
    }

    builder.build().context("Invalid configuration")
}
