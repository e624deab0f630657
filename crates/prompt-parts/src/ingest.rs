//! Attachment ingestion
//!
//! Files go through the [`ImageEncoder`] one at a time, in order, because
//! the running byte total decides whether each next file still fits.
//!
//! Rules, in the order they apply:
//! 1. At the image-count limit: reject the whole batch.
//! 2. More files than remaining slots: keep the first ones, note the cut.
//! 3. Decode failure: note it, continue with the next file.
//! 4. Over the per-image cap: note it, continue with the next file.
//! 5. Over the total cap: note it and stop the batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoder::ImageEncoder;
use crate::parts::{new_image_id, ImagePart, PromptDocument, PromptPart};
use crate::surface::PromptEditor;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Preferred output format after recompression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG for images with transparency, JPEG otherwise
    #[default]
    Auto,
    Jpeg,
    Png,
}

/// Limits applied to prompt attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachmentPolicy {
    /// Longest edge after downscaling, in pixels
    pub max_dimension: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
    pub format: OutputFormat,
    pub max_images: usize,
    #[serde(rename = "maxImageMB")]
    pub max_image_mb: f64,
    #[serde(rename = "maxTotalMB")]
    pub max_total_mb: f64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_dimension: 2048,
            quality: 85,
            format: OutputFormat::Auto,
            max_images: 5,
            max_image_mb: 4.0,
            max_total_mb: 14.0,
        }
    }
}

/// A file offered for attachment
#[derive(Debug, Clone)]
pub struct AttachmentFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl AttachmentFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Error,
}

/// Something the user should hear about after an ingestion batch
#[derive(Debug, Clone, PartialEq)]
pub enum IngestNotice {
    /// Already at the image limit; nothing was added
    CapacityReached { max_images: usize },
    /// Batch cut down to the remaining slots
    Truncated { offered: usize, accepted: usize },
    /// One file exceeded the per-image cap and was skipped
    ImageTooLarge {
        file: String,
        size_mb: f64,
        limit_mb: f64,
    },
    /// The total cap was hit; this file and the rest were dropped
    TotalBudgetExceeded { file: String, limit_mb: f64 },
    /// The encoder rejected the file
    DecodeFailed { file: String, message: String },
}

impl IngestNotice {
    pub fn severity(&self) -> NoticeSeverity {
        match self {
            Self::Truncated { .. } => NoticeSeverity::Info,
            _ => NoticeSeverity::Error,
        }
    }
}

impl fmt::Display for IngestNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityReached { max_images } => {
                write!(f, "最多只能添加 {} 张图片", max_images)
            }
            Self::Truncated { offered, accepted } => write!(
                f,
                "最多还能添加 {} 张图片，已忽略其余 {} 张",
                accepted,
                offered - accepted
            ),
            Self::ImageTooLarge {
                file,
                size_mb,
                limit_mb,
            } => write!(
                f,
                "图片 {} 过大（{:.1} MB），单张上限 {} MB",
                file, size_mb, limit_mb
            ),
            Self::TotalBudgetExceeded { file, limit_mb } => write!(
                f,
                "添加 {} 后图片总大小将超过 {} MB，已停止添加",
                file, limit_mb
            ),
            Self::DecodeFailed { file, message } => {
                write!(f, "图片 {} 处理失败：{}", file, message)
            }
        }
    }
}

/// Result of running a batch through the rules
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Accepted images, in file order, with fresh ids
    pub accepted: Vec<ImagePart>,
    pub notices: Vec<IngestNotice>,
}

/// Run a batch of files against the images already in `existing`
pub async fn prepare_attachments(
    mut files: Vec<AttachmentFile>,
    existing: &[PromptPart],
    policy: &AttachmentPolicy,
    encoder: &dyn ImageEncoder,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    if files.is_empty() {
        return outcome;
    }

    let document = PromptDocument::new(existing);
    let remaining = policy.max_images.saturating_sub(document.image_count());
    if remaining == 0 {
        outcome.notices.push(IngestNotice::CapacityReached {
            max_images: policy.max_images,
        });
        return outcome;
    }
    if files.len() > remaining {
        outcome.notices.push(IngestNotice::Truncated {
            offered: files.len(),
            accepted: remaining,
        });
        files.truncate(remaining);
    }

    let image_cap = policy.max_image_mb * BYTES_PER_MB;
    let total_cap = policy.max_total_mb * BYTES_PER_MB;
    let mut total_bytes = document.estimated_image_bytes();

    for file in files {
        let encoded = match encoder.encode(&file, policy).await {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("Attachment {} failed to process: {}", file.name, e);
                outcome.notices.push(IngestNotice::DecodeFailed {
                    file: file.name,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let image = ImagePart::new(new_image_id(), encoded.data, encoded.mime_type);
        let bytes = image.estimated_bytes();
        if bytes as f64 > image_cap {
            outcome.notices.push(IngestNotice::ImageTooLarge {
                file: file.name,
                size_mb: bytes as f64 / BYTES_PER_MB,
                limit_mb: policy.max_image_mb,
            });
            continue;
        }
        if (total_bytes + bytes) as f64 > total_cap {
            log::info!(
                "Attachment {} would exceed the {} MB total, stopping batch",
                file.name,
                policy.max_total_mb
            );
            outcome.notices.push(IngestNotice::TotalBudgetExceeded {
                file: file.name,
                limit_mb: policy.max_total_mb,
            });
            break;
        }

        total_bytes += bytes;
        outcome.accepted.push(image);
    }

    log::debug!(
        "Ingested {} attachment(s) with {} notice(s)",
        outcome.accepted.len(),
        outcome.notices.len()
    );
    outcome
}

/// Ingest without an editor: accepted images are appended to the end
pub async fn append_attachments(
    parts: &[PromptPart],
    files: Vec<AttachmentFile>,
    policy: &AttachmentPolicy,
    encoder: &dyn ImageEncoder,
) -> (Vec<PromptPart>, Vec<IngestNotice>) {
    let outcome = prepare_attachments(files, parts, policy, encoder).await;
    let mut updated = parts.to_vec();
    updated.extend(outcome.accepted.into_iter().map(PromptPart::Image));
    (PromptDocument::new(&updated).into_parts(), outcome.notices)
}

impl PromptEditor {
    /// Ingest files at the caret saved before the file chooser opened.
    ///
    /// The document is committed once for the whole batch.
    pub async fn attach_files(
        &mut self,
        files: Vec<AttachmentFile>,
        policy: &AttachmentPolicy,
        encoder: &dyn ImageEncoder,
    ) -> Vec<IngestNotice> {
        let existing = self.extract();
        let outcome = prepare_attachments(files, &existing, policy, encoder).await;

        if !outcome.accepted.is_empty() {
            self.restore_selection();
            for image in outcome.accepted {
                self.insert_token(image);
            }
            self.commit();
        }
        outcome.notices
    }
}
