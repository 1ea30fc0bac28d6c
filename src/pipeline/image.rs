//! Figure description through a vision-capable model.
//!
//! Best effort: an image that cannot be decoded, or a provider call that
//! fails, becomes a bracketed diagnostic in the corpus. After every
//! provider call the describer sleeps for the configured throttle so a
//! batch of figures does not trip per-minute rate limits.

use super::encode;
use super::extract::Extracted;
use crate::config::ReviewConfig;
use crate::corpus::UploadedFile;
use crate::generation::GenerationClient;
use crate::prompts::IMAGE_DESCRIPTION_PROMPT;
use crate::provider::{GenerationRequest, ModelId};
use std::time::Duration;
use tracing::{info, warn};

/// Describes uploaded figures with the run's resolved models.
pub struct ImageDescriber<'a> {
    client: &'a GenerationClient<'a>,
    candidates: &'a [ModelId],
    config: &'a ReviewConfig,
}

impl<'a> ImageDescriber<'a> {
    pub fn new(
        client: &'a GenerationClient<'a>,
        candidates: &'a [ModelId],
        config: &'a ReviewConfig,
    ) -> Self {
        Self {
            client,
            candidates,
            config,
        }
    }

    /// Describe one image upload.
    ///
    /// Returns `[Image description]: …` on success.
    pub async fn describe(&self, file: &UploadedFile) -> Extracted {
        let image = match encode::prepare_image(&file.bytes) {
            Ok(part) => part,
            Err(e) => {
                warn!("Cannot open image {}: {}", file.name, e);
                return Extracted::Diagnostic(format!("[Image analysis error: {e}]"));
            }
        };

        let request =
            GenerationRequest::with_image(IMAGE_DESCRIPTION_PROMPT, image).tuned(self.config);
        let outcome = self.client.generate(&request, self.candidates).await;
        self.throttle().await;

        match outcome {
            Ok(generated) => {
                info!("Described {} with {}", file.name, generated.model);
                Extracted::Content(format!("[Image description]: {}", generated.text.trim()))
            }
            Err(e) => {
                warn!("Image description failed for {}: {}", file.name, e);
                Extracted::Diagnostic(format!("[Image analysis error: {e}]"))
            }
        }
    }

    async fn throttle(&self) {
        if self.config.image_throttle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.image_throttle_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorKind};
    use crate::provider::{GenerativeBackend, ModelInfo};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct Vision {
        reply: Result<&'static str, ProviderErrorKind>,
        seen_mime: Mutex<Option<String>>,
    }

    #[async_trait]
    impl GenerativeBackend for Vision {
        fn name(&self) -> &str {
            "vision"
        }

        fn bind(&self, _: &ModelId) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn generate(
            &self,
            _: &ModelId,
            req: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            *self.seen_mime.lock().unwrap() = req.image.as_ref().map(|i| i.mime_type.clone());
            self.reply
                .map(str::to_string)
                .map_err(|kind| ProviderError::new(kind, "quota exceeded for vision"))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
            Ok(vec![])
        }
    }

    fn config() -> ReviewConfig {
        throttled(0)
    }

    fn throttled(ms: u64) -> ReviewConfig {
        ReviewConfig::builder()
            .api_key("k")
            .contact_email("a@b.c")
            .image_throttle_ms(ms)
            .build()
            .unwrap()
    }

    /// Virtual time spent describing `file` with a 1 s throttle.
    async fn time_describe(
        reply: Result<&'static str, ProviderErrorKind>,
        file: UploadedFile,
    ) -> Duration {
        let backend = Vision {
            reply,
            seen_mime: Mutex::new(None),
        };
        let client = GenerationClient::new(&backend);
        let models = vec![ModelId::from("gemini-1.5-flash")];
        let config = throttled(1000);
        let describer = ImageDescriber::new(&client, &models, &config);

        let start = tokio::time::Instant::now();
        describer.describe(&file).await;
        start.elapsed()
    }

    fn tiff_upload() -> UploadedFile {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Tiff).unwrap();
        UploadedFile::new("fig2.tif", buf)
    }

    #[tokio::test]
    async fn tiff_is_described_as_png() {
        let backend = Vision {
            reply: Ok("  Kaplan-Meier curve, two arms.  "),
            seen_mime: Mutex::new(None),
        };
        let client = GenerationClient::new(&backend);
        let models = vec![ModelId::from("gemini-1.5-flash")];
        let config = config();
        let describer = ImageDescriber::new(&client, &models, &config);

        let out = describer.describe(&tiff_upload()).await;
        assert_eq!(
            out,
            Extracted::Content("[Image description]: Kaplan-Meier curve, two arms.".into())
        );
        assert_eq!(backend.seen_mime.lock().unwrap().as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn provider_failure_becomes_diagnostic() {
        let backend = Vision {
            reply: Err(ProviderErrorKind::Quota),
            seen_mime: Mutex::new(None),
        };
        let client = GenerationClient::new(&backend);
        let models = vec![ModelId::from("gemini-1.5-flash")];
        let config = config();
        let describer = ImageDescriber::new(&client, &models, &config);

        match describer.describe(&tiff_upload()).await {
            Extracted::Diagnostic(text) => {
                assert!(text.starts_with("[Image analysis error:"));
                assert!(text.contains("quota exceeded for vision"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_image_skips_the_provider() {
        let backend = Vision {
            reply: Ok("never"),
            seen_mime: Mutex::new(None),
        };
        let client = GenerationClient::new(&backend);
        let models = vec![ModelId::from("m")];
        let config = config();
        let describer = ImageDescriber::new(&client, &models, &config);

        let out = describer.describe(&UploadedFile::new("x.png", b"junk".to_vec())).await;
        assert!(out.is_degraded());
        assert!(backend.seen_mime.lock().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_after_a_described_image() {
        let elapsed = time_describe(Ok("a chart"), tiff_upload()).await;
        assert_eq!(elapsed, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_after_a_failed_call() {
        let elapsed = time_describe(Err(ProviderErrorKind::Quota), tiff_upload()).await;
        assert_eq!(elapsed, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn no_pause_without_a_call() {
        let junk = UploadedFile::new("x.png", b"junk".to_vec());
        let elapsed = time_describe(Ok("never"), junk).await;
        assert_eq!(elapsed, Duration::ZERO);
    }
}
