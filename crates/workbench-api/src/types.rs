//! Wire types for both provider protocols
//!
//! The native (Gemini-style) types double as the internal representation:
//! chat-completions traffic is translated into them at the backend boundary.
//! Field aliases accept both the camelCase and snake_case spellings that
//! different servers and proxies emit.

use serde::{Deserialize, Serialize};

// ─── NATIVE PROTOCOL ────────────────────────────────────────────────

/// One conversation turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

impl Content {
    pub fn user(parts: Vec<WirePart>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn model(parts: Vec<WirePart>) -> Self {
        Self {
            role: Some("model".to_string()),
            parts,
        }
    }
}

/// A content part. Exactly one payload field is normally set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(default, alias = "file_data", skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    /// Provenance signature required to continue a conversation
    #[serde(default, alias = "thought_signature", skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl WirePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Default::default()
        }
    }
}

/// Inline base64 payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default, alias = "mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

/// Reference to a file hosted by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(default, alias = "mime_type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, alias = "file_uri")]
    pub file_uri: String,
}

/// Native `generateContent` request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

/// Output image hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(GoogleSearch {}),
        }
    }
}

/// Empty directive object enabling search grounding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleSearch {}

/// Native response body (one chunk of a possibly streamed reply)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finish_reason", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// A response body is either one object or an array of stream chunks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NativeEnvelope {
    Chunks(Vec<NativeResponse>),
    Single(NativeResponse),
}

impl NativeEnvelope {
    pub fn into_chunks(self) -> Vec<NativeResponse> {
        match self {
            Self::Chunks(chunks) => chunks,
            Self::Single(response) => vec![response],
        }
    }
}

// ─── CHAT-COMPLETIONS PROTOCOL ──────────────────────────────────────

/// Chat message with multimodal content support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// Content part - text or image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlData },
}

/// Image URL data (usually a `data:` URI)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrlData {
    pub url: String,
}

/// Chat completion request (OpenAI-compatible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Chat completion response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatResponseMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<ChatResponseContent>,
    /// Images some OpenAI-compatible gateways return beside the text
    #[serde(default)]
    pub images: Vec<ChatImage>,
}

/// Message content is a plain string or a list of typed parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatResponseContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatImage {
    #[serde(alias = "imageUrl")]
    pub image_url: ImageUrlData,
}

/// Split a `data:<mime>;base64,<payload>` URI
pub fn parse_data_url(url: &str) -> Option<Blob> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    Some(Blob {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

/// Build a `data:` URI from an inline payload
pub fn to_data_url(blob: &Blob) -> String {
    format!("data:{};base64,{}", blob.mime_type, blob.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_accepts_both_spellings() {
        let camel: WirePart = serde_json::from_value(serde_json::json!({
            "inlineData": {"mimeType": "image/png", "data": "AAA"},
            "thoughtSignature": "sig"
        }))
        .unwrap();
        let snake: WirePart = serde_json::from_value(serde_json::json!({
            "inline_data": {"mime_type": "image/png", "data": "AAA"},
            "thought_signature": "sig"
        }))
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.inline_data.unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = NativeRequest {
            contents: vec![Content::user(vec![WirePart::text("hi")])],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE".into()],
                image_config: Some(ImageConfig {
                    aspect_ratio: Some("16:9".into()),
                    image_size: None,
                }),
            }),
            safety_settings: Vec::new(),
            tools: vec![Tool::google_search()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert!(json["generationConfig"]["imageConfig"].get("imageSize").is_none());
        assert!(json.get("safetySettings").is_none());
        assert_eq!(json["tools"][0]["googleSearch"], serde_json::json!({}));
    }

    #[test]
    fn test_envelope_single_or_chunks() {
        let single: NativeEnvelope =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert_eq!(single.into_chunks().len(), 1);

        let chunks: NativeEnvelope =
            serde_json::from_value(serde_json::json!([{"candidates": []}, {}])).unwrap();
        assert_eq!(chunks.into_chunks().len(), 2);
    }

    #[test]
    fn test_data_url_round_trip() {
        let blob = parse_data_url("data:image/webp;base64,UklGR").unwrap();
        assert_eq!(blob.mime_type, "image/webp");
        assert_eq!(blob.data, "UklGR");
        assert_eq!(to_data_url(&blob), "data:image/webp;base64,UklGR");
        assert!(parse_data_url("https://example.com/a.png").is_none());
    }
}
