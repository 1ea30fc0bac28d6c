//! Post-processing: deterministic cleanup of generated text.
//!
//! ## Why is post-processing necessary?
//!
//! Models follow the "keywords only" and "plain report" instructions most of
//! the time, not all of the time. Typical artefacts:
//!
//! - the whole answer wrapped in ` ```markdown ... ``` ` fences
//! - keywords returned as a bulleted or comma-separated list, sometimes
//!   behind a `Keywords:` label or inside quotes
//! - Windows-style `\r\n` line endings and zero-width characters
//!
//! Keyword cleanup matters most: the keyword string is pasted verbatim into
//! the PubMed query, where stray punctuation changes the search.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise a model's keyword answer into one line of space-separated terms.
///
/// 1. Strip outer fences
/// 2. Drop a leading `Keywords:` style label
/// 3. Drop list markers at line starts
/// 4. Replace separators (commas, semicolons, newlines) and markdown marks
///    with spaces; quotes and apostrophes stay, PubMed reads them
/// 5. Collapse whitespace
pub fn normalise_keywords(raw: &str) -> String {
    let s = strip_fences(raw);
    let s = RE_KEYWORD_LABEL.replace(s.trim(), "");
    let s = RE_LIST_MARKER.replace_all(&s, "");
    let s = s.replace([',', ';', '\n', '\r', '\t', '`', '*'], " ");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a generated report.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Ensure the text ends with exactly one newline
pub fn clean_report(input: &str) -> String {
    let s = strip_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Keyword rules ────────────────────────────────────────────────────────

static RE_KEYWORD_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?(?:mesh\s+terms|keywords?)(?:\*\*)?\s*:(?:\*\*)?\s*").unwrap()
});

static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+").unwrap());

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ──────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

// ── Rule 6: Ensure text ends with single newline ─────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_keywords_untouched() {
        assert_eq!(
            normalise_keywords("sepsis biomarkers procalcitonin"),
            "sepsis biomarkers procalcitonin"
        );
    }

    #[test]
    fn comma_list_with_label() {
        assert_eq!(
            normalise_keywords("Keywords: Sepsis, Biomarkers; C-Reactive Protein\n"),
            "Sepsis Biomarkers C-Reactive Protein"
        );
    }

    #[test]
    fn bulleted_and_fenced_list() {
        let raw = "```\n- sepsis\n- `septic shock`\n1. lactate\n```";
        assert_eq!(normalise_keywords(raw), "sepsis septic shock lactate");
    }

    #[test]
    fn apostrophes_and_phrase_quotes_kept() {
        assert_eq!(
            normalise_keywords("Crohn's disease, \"inflammatory bowel disease\", Sjögren’s"),
            "Crohn's disease \"inflammatory bowel disease\" Sjögren’s"
        );
    }

    #[test]
    fn hyphenated_terms_survive() {
        assert_eq!(
            normalise_keywords("**MeSH terms:** COVID-19 long-term"),
            "COVID-19 long-term"
        );
    }

    #[test]
    fn empty_answer_is_empty() {
        assert_eq!(normalise_keywords("  \n "), "");
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```markdown\n# Hello\nWorld\n```"), "# Hello\nWorld");
        assert_eq!(strip_fences("# Hello\nWorld"), "# Hello\nWorld");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("he\u{200B}llo\u{FEFF}"), "hello");
    }

    #[test]
    fn test_clean_report_full_pipeline() {
        let input = "```markdown\n## General Comments   \r\n\r\nSolid cohort.\n\n\n\n\n\n## Recommendation\n**Minor Revision**\n```";
        let result = clean_report(input);
        assert!(result.starts_with("## General Comments\n"));
        assert!(result.ends_with("**Minor Revision**\n"));
        assert!(!result.contains("\n\n\n\n"));
        assert!(!result.contains('\r'));
    }
}
