//! Image processing for attachments
//!
//! The ingestion pipeline only depends on the [`ImageEncoder`] trait: raw
//! file + policy in, `{mime_type, base64}` out. [`ImageProcessor`] is the
//! default implementation built on the `image` crate.

use std::io::Cursor;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::ingest::{AttachmentFile, AttachmentPolicy, OutputFormat};

/// Errors from decoding or re-encoding an attachment
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Unsupported or corrupt image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Image worker failed: {0}")]
    Worker(String),
}

/// A processed attachment ready to embed in a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

/// Turns a raw file into an embeddable image payload
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    async fn encode(
        &self,
        file: &AttachmentFile,
        policy: &AttachmentPolicy,
    ) -> Result<EncodedImage, EncodeError>;
}

/// Default encoder: downscale to the policy's dimension cap and recompress
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProcessor;

#[async_trait]
impl ImageEncoder for ImageProcessor {
    async fn encode(
        &self,
        file: &AttachmentFile,
        policy: &AttachmentPolicy,
    ) -> Result<EncodedImage, EncodeError> {
        let bytes = file.bytes.clone();
        let policy = policy.clone();
        tokio::task::spawn_blocking(move || encode_blocking(&bytes, &policy))
            .await
            .map_err(|e| EncodeError::Worker(e.to_string()))?
    }
}

fn encode_blocking(bytes: &[u8], policy: &AttachmentPolicy) -> Result<EncodedImage, EncodeError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| EncodeError::Decode(e.to_string()))?;
    let resized = downscale(decoded, policy.max_dimension);

    let as_png = match policy.format {
        OutputFormat::Png => true,
        OutputFormat::Jpeg => false,
        OutputFormat::Auto => resized.color().has_alpha(),
    };

    let mut buffer = Cursor::new(Vec::new());
    let mime_type = if as_png {
        resized
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
        "image/png"
    } else {
        let quality = policy.quality.clamp(1, 100);
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode_image(&resized.to_rgb8())
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
        "image/jpeg"
    };

    Ok(EncodedImage {
        mime_type: mime_type.to_string(),
        data: STANDARD.encode(buffer.into_inner()),
    })
}

/// Shrink so the longest edge fits `max_dimension`, keeping aspect ratio
fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if max_dimension == 0 || image.width().max(image.height()) <= max_dimension {
        return image;
    }
    log::debug!(
        "Downscaling {}x{} attachment to fit {}px",
        image.width(),
        image.height(),
        max_dimension
    );
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}
