//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on Tokio worker threads. The whole load-and-read
//! cycle runs on the blocking pool.
//!
//! The library handle is bound per call: `Pdfium` is `!Send`, and the OS
//! caches the `dlopen`, so a repeat bind is cheap.

use super::extract::Extracted;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Extract the text layer of a PDF, page by page.
///
/// Pages without a text layer (scans, figures) contribute nothing. Any
/// failure yields a `[PDF read error: …]` diagnostic.
pub async fn extract_pdf(bytes: Vec<u8>) -> Extracted {
    let result = tokio::task::spawn_blocking(move || extract_pdf_blocking(&bytes)).await;

    match result {
        Ok(Ok(text)) => Extracted::Content(text),
        Ok(Err(reason)) => Extracted::Diagnostic(format!("[PDF read error: {reason}]")),
        Err(e) => Extracted::Diagnostic(format!("[PDF read error: extraction task failed: {e}]")),
    }
}

fn extract_pdf_blocking(bytes: &[u8]) -> Result<String, String> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(describe_load_error)?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| format!("page {}: {e}", idx + 1))?
            .all();
        if text.trim().is_empty() {
            debug!("Page {} has no text layer", idx + 1);
            continue;
        }
        texts.push(text);
    }

    Ok(texts.join("\n"))
}

/// Bind pdfium: next to the executable first, then the system library.
fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| format!("pdfium library not available: {e}"))?;
    Ok(Pdfium::new(bindings))
}

fn describe_load_error(e: PdfiumError) -> String {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        "document is password-protected".to_string()
    } else {
        format!("not a readable PDF ({msg})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_bytes_become_diagnostic() {
        // Whether or not pdfium is installed, this must not panic or error.
        let out = extract_pdf(b"definitely not a pdf".to_vec()).await;
        match out {
            Extracted::Diagnostic(text) => assert!(text.starts_with("[PDF read error:")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_input_becomes_diagnostic() {
        assert!(extract_pdf(Vec::new()).await.is_degraded());
    }
}
