//! Per-format dispatch from an [`UploadedFile`] to text.
//!
//! Every extractor returns an [`Extracted`] value, never an error. A file
//! that cannot be read degrades to a bracketed diagnostic inside the corpus
//! and the run continues with whatever else was uploaded.

use super::{image::ImageDescriber, pdf, word};
use crate::corpus::UploadedFile;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of extracting one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Extracted {
    /// Text read from the file (possibly empty).
    Content(String),
    /// The file could not be read; the text explains why.
    Diagnostic(String),
    /// An expected, recognised failure (such as a legacy Word file) with a
    /// human-readable explanation.
    Advisory(String),
}

impl Extracted {
    pub fn text(&self) -> &str {
        match self {
            Extracted::Content(t) | Extracted::Diagnostic(t) | Extracted::Advisory(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Extracted::Content(t) | Extracted::Diagnostic(t) | Extracted::Advisory(t) => t,
        }
    }

    /// Whether the text is a placeholder rather than file content.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Extracted::Content(_))
    }
}

/// File type as declared by the upload's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Word,
    LegacyWord,
    Image,
    Unsupported,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Word,
            "doc" => FileKind::LegacyWord,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "webp" | "gif" | "bmp" => FileKind::Image,
            _ => FileKind::Unsupported,
        }
    }
}

/// Extract text from one upload.
///
/// Images are described by the configured model through `images`; all
/// other kinds are read locally.
pub async fn extract(file: &UploadedFile, images: &ImageDescriber<'_>) -> Extracted {
    let ext = file.extension();
    let kind = FileKind::from_extension(&ext);
    debug!("Extracting {} as {:?}", file.name, kind);

    match kind {
        FileKind::Pdf => pdf::extract_pdf(file.bytes.clone()).await,
        FileKind::Word => word::extract_word(&file.bytes, false),
        FileKind::LegacyWord => word::extract_word(&file.bytes, true),
        FileKind::Image => images.describe(file).await,
        FileKind::Unsupported => Extracted::Diagnostic(format!(
            "[Unsupported file type: '{}']",
            if ext.is_empty() { file.name.as_str() } else { ext.as_str() }
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_extension() {
        assert_eq!(FileKind::from_extension("PDF"), FileKind::Pdf);
        assert_eq!(FileKind::from_extension("docx"), FileKind::Word);
        assert_eq!(FileKind::from_extension("doc"), FileKind::LegacyWord);
        assert_eq!(FileKind::from_extension("tif"), FileKind::Image);
        assert_eq!(FileKind::from_extension("jpeg"), FileKind::Image);
        assert_eq!(FileKind::from_extension("xlsx"), FileKind::Unsupported);
        assert_eq!(FileKind::from_extension(""), FileKind::Unsupported);
    }

    #[test]
    fn degraded_variants() {
        assert!(!Extracted::Content(String::new()).is_degraded());
        assert!(Extracted::Diagnostic("[x]".into()).is_degraded());
        assert!(Extracted::Advisory("legacy".into()).is_degraded());
        assert_eq!(Extracted::Advisory("legacy".into()).into_text(), "legacy");
    }
}
