//! Response unification
//!
//! Walks every chunk, candidate and part in order and pulls out images,
//! text and the first signed text fragment.

use serde::{Deserialize, Serialize};

use crate::types::{to_data_url, Blob, NativeResponse};

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Where a generated image lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSource {
    /// Base64 payload
    Inline(String),
    /// Provider-hosted file
    Uri(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub mime_type: String,
    pub source: ImageSource,
    /// Provenance signature for multi-turn follow-ups
    pub signature: Option<String>,
}

impl GeneratedImage {
    /// A `data:` URI for inline images, the file URI otherwise
    pub fn to_url(&self) -> String {
        match &self.source {
            ImageSource::Inline(data) => to_data_url(&Blob {
                mime_type: self.mime_type.clone(),
                data: data.clone(),
            }),
            ImageSource::Uri(uri) => uri.clone(),
        }
    }

    pub fn inline_data(&self) -> Option<&str> {
        match &self.source {
            ImageSource::Inline(data) => Some(data),
            ImageSource::Uri(_) => None,
        }
    }
}

/// A text fragment with its provenance signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedText {
    pub text: String,
    pub signature: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedOutput {
    pub images: Vec<GeneratedImage>,
    /// All non-thought text, in order
    pub text: String,
    /// First text fragment that carried a signature
    pub signed_text: Option<SignedText>,
}

impl ExtractedOutput {
    pub fn signatures(&self) -> Vec<Option<String>> {
        self.images.iter().map(|image| image.signature.clone()).collect()
    }

    /// The first signature anywhere in the output
    pub fn first_signature(&self) -> Option<String> {
        self.signed_text
            .as_ref()
            .map(|signed| signed.signature.clone())
            .or_else(|| self.images.iter().find_map(|image| image.signature.clone()))
    }
}

/// Collect images, text and the first signed text across response chunks
pub fn extract_output(chunks: &[NativeResponse]) -> ExtractedOutput {
    let mut output = ExtractedOutput::default();

    let parts = chunks
        .iter()
        .flat_map(|chunk| chunk.candidates.iter())
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter());

    for part in parts {
        let signature = part
            .thought_signature
            .as_ref()
            .filter(|signature| !signature.is_empty())
            .cloned();

        if let Some(blob) = part.inline_data.as_ref().filter(|blob| !blob.data.is_empty()) {
            if is_image_mime(Some(&blob.mime_type)) {
                output.images.push(GeneratedImage {
                    mime_type: mime_or_default(Some(&blob.mime_type)),
                    source: ImageSource::Inline(blob.data.clone()),
                    signature,
                });
            }
            continue;
        }

        if let Some(file) = part.file_data.as_ref().filter(|file| !file.file_uri.is_empty()) {
            if is_image_mime(file.mime_type.as_deref()) {
                output.images.push(GeneratedImage {
                    mime_type: mime_or_default(file.mime_type.as_deref()),
                    source: ImageSource::Uri(file.file_uri.clone()),
                    signature,
                });
            }
            continue;
        }

        if part.thought == Some(true) {
            continue;
        }
        if let Some(text) = part.text.as_ref().filter(|text| !text.is_empty()) {
            output.text.push_str(text);
            if output.signed_text.is_none() {
                if let Some(signature) = signature {
                    output.signed_text = Some(SignedText {
                        text: text.clone(),
                        signature,
                    });
                }
            }
        }
    }

    output
}

/// A missing or blank mime type is assumed to be an image
fn is_image_mime(mime_type: Option<&str>) -> bool {
    match mime_type.map(str::trim) {
        Some(mime) if !mime.is_empty() => mime.starts_with("image/"),
        _ => true,
    }
}

fn mime_or_default(mime_type: Option<&str>) -> String {
    match mime_type.map(str::trim) {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => DEFAULT_IMAGE_MIME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NativeEnvelope;
    use serde_json::json;

    fn chunks(value: serde_json::Value) -> Vec<NativeResponse> {
        serde_json::from_value::<NativeEnvelope>(value)
            .unwrap()
            .into_chunks()
    }

    #[test]
    fn test_collects_in_order_across_chunks() {
        let output = extract_output(&chunks(json!([
            {"candidates": [{"content": {"role": "model", "parts": [
                {"text": "thinking...", "thought": true, "thoughtSignature": "t-sig"},
                {"text": "Here you go. ", "thoughtSignature": "text-sig"},
                {"inlineData": {"mimeType": "image/png", "data": "IMG1"}, "thoughtSignature": "img-sig"}
            ]}}]},
            {"candidates": [{"content": {"parts": [
                {"text": "Second.", "thoughtSignature": "later-sig"},
                {"fileData": {"fileUri": "gs://bucket/img2"}}
            ]}}]}
        ])));

        assert_eq!(output.text, "Here you go. Second.");
        assert_eq!(
            output.signed_text,
            Some(SignedText {
                text: "Here you go. ".into(),
                signature: "text-sig".into()
            })
        );
        assert_eq!(output.images.len(), 2);
        assert_eq!(output.images[0].inline_data(), Some("IMG1"));
        assert_eq!(output.images[1].mime_type, "image/png");
        assert_eq!(output.images[1].to_url(), "gs://bucket/img2");
        assert_eq!(
            output.signatures(),
            vec![Some("img-sig".to_string()), None]
        );
    }

    #[test]
    fn test_non_image_payloads_are_skipped() {
        let output = extract_output(&chunks(json!({"candidates": [{"content": {"parts": [
            {"fileData": {"fileUri": "gs://bucket/clip.mp4", "mimeType": "video/mp4"}},
            {"inlineData": {"mimeType": "application/pdf", "data": "PDF"}},
            {"fileData": {"fileUri": "gs://bucket/img.webp", "mimeType": "image/webp"}},
            {"text": "done"}
        ]}}]})));

        assert_eq!(output.images.len(), 1);
        assert_eq!(output.images[0].mime_type, "image/webp");
        assert_eq!(output.images[0].to_url(), "gs://bucket/img.webp");
        assert_eq!(output.text, "done");
    }

    #[test]
    fn test_empty_candidates() {
        let output = extract_output(&chunks(json!({"candidates": [{"finishReason": "SAFETY"}]})));
        assert!(output.images.is_empty());
        assert!(output.text.is_empty());
        assert!(output.first_signature().is_none());
    }

    #[test]
    fn test_data_url() {
        let image = GeneratedImage {
            mime_type: "image/jpeg".into(),
            source: ImageSource::Inline("QQ".into()),
            signature: None,
        };
        assert_eq!(image.to_url(), "data:image/jpeg;base64,QQ");
    }
}
