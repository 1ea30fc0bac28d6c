//! Pipeline stages below the orchestrator.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──┬─▶ pdf     (pdfium text layer)
//! (path/URL)          ├─▶ word    (docx XML)
//!                     └─▶ image ─▶ encode ─▶ model description
//!
//! corpus ─▶ keywords ─▶ postprocess ─▶ literature ─▶ report ─▶ postprocess
//! ```
//!
//! 1. [`input`]: load a local path or download a URL into memory
//! 2. [`extract`]: dispatch on extension; never fails, degrades to text
//! 3. [`pdf`] / [`word`] / [`image`]: per-format extractors; [`pdf`] runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`encode`]: base64 wrapping and TIFF-style transcoding for images
//! 5. [`literature`]: the advisory PubMed search
//! 6. [`postprocess`]: deterministic cleanup of keyword and report text

pub mod encode;
pub mod extract;
pub mod image;
pub mod input;
pub mod literature;
pub mod pdf;
pub mod postprocess;
pub mod word;
