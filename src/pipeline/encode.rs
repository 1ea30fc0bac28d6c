//! Image encoding: uploads → base64 [`ImagePart`] for multimodal requests.
//!
//! PNG, JPEG and WebP are accepted by every multimodal provider and are
//! forwarded untouched. Anything else (TIFF above all, which Gemini rejects
//! intermittently) is decoded and re-encoded as PNG in memory. PNG is
//! lossless, so fine print in figures and axis labels survives.

use crate::provider::ImagePart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Formats forwarded without transcoding.
const PASSTHROUGH: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Whether `format` needs transcoding before submission.
pub fn needs_transcode(format: ImageFormat) -> bool {
    !PASSTHROUGH.contains(&format)
}

/// Wrap already-encoded bytes.
pub fn encode_bytes(bytes: &[u8], format: ImageFormat) -> ImagePart {
    let data = STANDARD.encode(bytes);
    debug!("Encoded {:?} image → {} bytes base64", format, data.len());
    ImagePart {
        mime_type: format.to_mime_type().to_string(),
        data,
    }
}

/// Encode a decoded image as base64 PNG.
pub fn encode_png(img: &DynamicImage) -> Result<ImagePart, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(encode_bytes(&buf, ImageFormat::Png))
}

/// Decode `bytes`, transcoding to PNG when the format needs it.
///
/// Decoding always happens, so an unreadable file is caught here rather
/// than by the provider.
pub fn prepare_image(bytes: &[u8]) -> Result<ImagePart, image::ImageError> {
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;

    if needs_transcode(format) {
        debug!(
            "Transcoding {:?} ({}x{}) to PNG",
            format,
            img.width(),
            img.height()
        );
        encode_png(&img)
    } else {
        Ok(encode_bytes(bytes, format))
    }
}
