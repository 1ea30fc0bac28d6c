//! Input loading: turn a user-supplied path or URL into an [`UploadedFile`].
//!
//! Uploads are held in memory for the duration of one run; nothing is
//! written to disk. A downloaded file is named after the last URL path
//! segment, or after its `Content-Type` when the URL has no usable name, so
//! the extractor dispatch still sees a meaningful extension.

use crate::corpus::UploadedFile;
use crate::error::ReviewError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load one upload from a local path or an HTTP(S) URL.
pub async fn load_upload(input: &str, timeout_secs: u64) -> Result<UploadedFile, ReviewError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Load several uploads, preserving order. Stops at the first failure.
pub async fn load_uploads<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<Vec<UploadedFile>, ReviewError> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        files.push(load_upload(input.as_ref(), timeout_secs).await?);
    }
    Ok(files)
}

async fn read_local(path_str: &str) -> Result<UploadedFile, ReviewError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ReviewError::PermissionDenied {
            path: path.clone(),
        },
        _ => ReviewError::FileNotFound { path: path.clone() },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedFile::new(name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedFile, ReviewError> {
    info!("Downloading: {}", url);

    let failed = |reason: String| ReviewError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ReviewError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let name = filename_for(url, content_type.as_deref());

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} ({} bytes)", name, bytes.len());

    Ok(UploadedFile::new(name, bytes.to_vec()))
}

/// A file name for a download: the last URL segment when it has an
/// extension, otherwise `download.<ext>` from the content type.
fn filename_for(url: &str, content_type: Option<&str>) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(last) = parsed.path_segments().and_then(|mut s| s.next_back()) {
            if !last.is_empty() && last.contains('.') {
                return last.to_string();
            }
        }
    }

    let ext = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| extension_for_mime(mime.trim()))
        .unwrap_or("bin");
    format!("download.{ext}")
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "application/pdf" => "pdf",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/msword" => "doc",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/tiff" => "tif",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_or_content_type() {
        assert_eq!(filename_for("https://x.org/files/fig1.tif?dl=1", None), "fig1.tif");
        assert_eq!(
            filename_for("https://x.org/download", Some("application/pdf; charset=binary")),
            "download.pdf"
        );
        assert_eq!(filename_for("https://x.org/", Some("text/html")), "download.bin");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = load_upload("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ReviewError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_keeps_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.docx");
        std::fs::write(&path, b"PK").unwrap();

        let file = load_upload(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(file.name, "b.docx");
        assert_eq!(file.bytes, b"PK");
    }

    #[tokio::test]
    async fn download_uses_content_type() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/get")
            .with_header("content-type", "image/png")
            .with_body([0x89u8, b'P', b'N', b'G'])
            .create_async()
            .await;

        let file = load_upload(&format!("{}/get", server.url()), 5).await.unwrap();
        assert_eq!(file.name, "download.png");
        assert_eq!(file.extension(), "png");
    }

    #[tokio::test]
    async fn download_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/gone.pdf").with_status(404).create_async().await;

        let err = load_upload(&format!("{}/gone.pdf", server.url()), 5).await.unwrap_err();
        assert!(matches!(err, ReviewError::DownloadFailed { .. }));
    }
}
