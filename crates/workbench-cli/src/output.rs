//! Writing results to disk and the terminal

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use workbench_api::{GeneratedImage, ImageSource, WorkbenchSettings};

use crate::error::CliError;

/// File extension for an image mime type
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Write inline images into `out_dir`; hosted images are returned as-is.
///
/// Returns one entry per image: the written path or the remote URI.
pub async fn write_images(
    out_dir: &Path,
    stamp: &str,
    images: &[GeneratedImage],
) -> Result<Vec<String>, CliError> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| CliError::io(out_dir, e))?;

    let mut written = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        match &image.source {
            ImageSource::Inline(data) => {
                let bytes = STANDARD.decode(data)?;
                let path: PathBuf = out_dir.join(format!(
                    "promptloom-{}-{}.{}",
                    stamp,
                    index + 1,
                    extension_for(&image.mime_type)
                ));
                tokio::fs::write(&path, bytes)
                    .await
                    .map_err(|e| CliError::io(&path, e))?;
                written.push(path.display().to_string());
            }
            ImageSource::Uri(uri) => written.push(uri.clone()),
        }
    }
    Ok(written)
}

/// Keep the first and last four characters of a key
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    match chars.len() {
        0 => String::new(),
        len if len <= 8 => "*".repeat(len),
        len => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[len - 4..].iter().collect();
            format!("{}****{}", head, tail)
        }
    }
}

/// Settings copy safe to print
pub fn masked_settings(settings: &WorkbenchSettings) -> WorkbenchSettings {
    let mut masked = settings.clone();
    masked.api_key = mask_key(&settings.api_key);
    masked.openai_api_key = mask_key(&settings.openai_api_key);
    masked.analysis.api_key = mask_key(&settings.analysis.api_key);
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(""), "");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("AIzaSyExampleKey1234"), "AIza****1234");
    }

    #[test]
    fn test_masked_settings_hides_every_key() {
        let mut settings = WorkbenchSettings::default();
        settings.api_key = "gemini-secret-key".into();
        settings.openai_api_key = "sk-openai-secret".into();
        settings.analysis.api_key = "analysis-secret".into();

        let json = serde_json::to_string(&masked_settings(&settings)).unwrap();
        assert!(!json.contains("secret"));
    }

    #[tokio::test]
    async fn test_write_images() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            GeneratedImage {
                mime_type: "image/png".into(),
                source: ImageSource::Inline(STANDARD.encode(b"png-bytes")),
                signature: None,
            },
            GeneratedImage {
                mime_type: "image/png".into(),
                source: ImageSource::Uri("https://cdn.example.com/2.png".into()),
                signature: None,
            },
        ];

        let written = write_images(dir.path(), "20260101-120000", &images)
            .await
            .unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("promptloom-20260101-120000-1.png"));
        assert_eq!(written[1], "https://cdn.example.com/2.png");
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_bad_base64_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![GeneratedImage {
            mime_type: "image/png".into(),
            source: ImageSource::Inline("@@not base64@@".into()),
            signature: None,
        }];
        assert!(matches!(
            write_images(dir.path(), "x", &images).await,
            Err(CliError::Decode(_))
        ));
    }
}
