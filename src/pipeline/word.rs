//! Word text extraction.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`.
//! Paragraph texts are read in document order and joined with newlines.
//!
//! Legacy `.doc` files are OLE compound documents, not zip archives. They
//! go through the same reader and, when it fails, get a fixed advisory
//! asking for a conversion instead of a raw parser message.

use super::extract::Extracted;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// Text substituted for a legacy Word file that could not be read.
pub const LEGACY_WORD_ADVISORY: &str = "[Format notice: this is a legacy Word (.doc) file, \
which cannot be read directly. Save it as .docx or PDF and upload it again.]";

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
enum DocxError {
    #[error("not a .docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("cannot read word/document.xml: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed word/document.xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Extract paragraph text from a Word upload.
///
/// `legacy` is set when the declared extension is `.doc`.
pub fn extract_word(bytes: &[u8], legacy: bool) -> Extracted {
    match read_docx(bytes) {
        Ok(text) => Extracted::Content(text),
        Err(e) if legacy => {
            debug!("Legacy Word file not readable: {}", e);
            Extracted::Advisory(LEGACY_WORD_ADVISORY.to_string())
        }
        Err(e) => Extracted::Diagnostic(format!("[Word read error: {e}]")),
    }
}

fn read_docx(bytes: &[u8]) -> Result<String, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    Ok(paragraphs(&xml)?.join("\n"))
}

// ── XML walking ──────────────────────────────────────────────────────────

/// Paragraph texts in document order, including empty paragraphs.
///
/// Paragraphs nested in a text box (`w:txbxContent`) are folded into the
/// enclosing paragraph on their own line, where they appear.
fn paragraphs(xml: &str) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    // One buffer per open `w:p`; more than one means a text box.
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(parent) = open.last_mut() {
                        push_line_break(parent);
                    }
                    open.push(String::new());
                }
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = run_depth > 0,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    let text = open.pop().unwrap_or_default();
                    match open.last_mut() {
                        Some(parent) => {
                            parent.push_str(&text);
                            parent.push('\n');
                        }
                        None => out.push(text),
                    }
                }
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" if open.is_empty() => out.push(String::new()),
                b"w:tab" if run_depth > 0 => push_char(&mut open, '\t'),
                b"w:br" | b"w:cr" if run_depth > 0 => push_char(&mut open, '\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(current) = open.last_mut() {
                    current.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn push_char(open: &mut [String], c: char) {
    if let Some(current) = open.last_mut() {
        current.push(c);
    }
}

fn push_line_break(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}
