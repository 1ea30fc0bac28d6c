//! Prompts for the three generation steps: figure description, keyword
//! extraction and report synthesis.
//!
//! Centralising every prompt here keeps wording changes in one place and
//! lets unit tests inspect prompts without a live model.

/// Instruction sent with every uploaded figure.
pub const IMAGE_DESCRIPTION_PROMPT: &str = "This is a figure from a medical manuscript. \
Describe in detail the data, trends, legends, titles and key information it shows. \
Ignore page numbers, watermarks and other irrelevant marks.";

/// Build the keyword-extraction prompt around a corpus excerpt.
///
/// The excerpt is expected to be already truncated to the keyword budget.
pub fn keyword_prompt(excerpt: &str) -> String {
    format!(
        r#"Task: you are an experienced medical peer reviewer. Read the manuscript excerpt below and extract 3-5 core medical keywords (MeSH terms) for searching PubMed for the most recent literature.
Output requirements: keywords only, in English, separated by spaces, nothing else.

Manuscript excerpt:
{excerpt}"#
    )
}

/// Build the report-synthesis prompt.
///
/// `excerpt` is the corpus truncated to the report budget, `literature` is
/// whatever the literature stage produced (abstracts, sentinel or an error
/// description), `language` is the language the report is written in.
pub fn review_prompt(excerpt: &str, literature: &str, language: &str) -> String {
    format!(
        r#"Role:
You are a senior physician with extensive clinical experience. A colleague has submitted the manuscript below for your review.

Tone:
1. Conversational: like a chat over coffee in the staff room, relaxed but professional.
2. No boilerplate: avoid stock transitions such as "firstly", "secondly", "in conclusion".
3. Direct: point out problems plainly, and do not hold back praise where it is earned.

Write the following sections:

1. General Comments
   Briefly state what the study does and how clinically meaningful it is.

2. Reality Check
   Using the recent PubMed abstracts provided below, judge whether the findings agree with the latest evidence, are already outdated, or contradict recent data.

3. Queries for Authors
   List 3-5 specific, pointed questions the authors must answer (for example: small sample size, unclear exclusion criteria, questionable statistics, inconsistent figures).

4. Recommendation
   Choose exactly one of: Accept, Minor Revision, Major Revision, Reject.
   Write only the chosen verdict in bold (for example **Major Revision**) and explain why.

---
[Manuscript content, including figure descriptions]
{excerpt}

[Recent PubMed abstracts]
{literature}
---

Write the report in {language}."#
    )
}
