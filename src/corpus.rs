//! Uploaded files and the merged text corpus built from them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Label used when an upload arrives without a usable file name.
const UNNAMED_LABEL: &str = "unnamed";

/// One uploaded file: raw bytes plus the name they arrived under.
///
/// The name is used only to derive the type tag and the corpus label.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased extension without the dot, or `""`.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    /// The label this file gets in the corpus: the base name, never empty.
    pub fn label(&self) -> String {
        let base = Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .trim();
        if base.is_empty() {
            UNNAMED_LABEL.to_string()
        } else {
            base.to_string()
        }
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Text extracted from one upload, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFragment {
    source_label: String,
    pub text: String,
}

impl CorpusFragment {
    /// Build a fragment; an empty label falls back to `"unnamed"`.
    pub fn new(source_label: impl Into<String>, text: impl Into<String>) -> Self {
        let label = source_label.into();
        let label = label.trim();
        Self {
            source_label: if label.is_empty() {
                UNNAMED_LABEL.to_string()
            } else {
                label.to_string()
            },
            text: text.into(),
        }
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    /// The delimiter line that opens this fragment's section.
    pub fn delimiter(&self) -> String {
        format!("--- File: {} ---", self.source_label)
    }
}

/// All fragments of one run, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    fragments: Vec<CorpusFragment>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: CorpusFragment) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[CorpusFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The merged text: each fragment preceded by its delimiter line.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| format!("{}\n{}", f.delimiter(), f.text.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl FromIterator<CorpusFragment> for Corpus {
    fn from_iter<I: IntoIterator<Item = CorpusFragment>>(iter: I) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}

/// The first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, so multi-byte text is never split
/// mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
