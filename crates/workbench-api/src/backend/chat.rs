//! Chat-completions protocol (`/chat/completions`)
//!
//! Requests are restructured into chat messages; replies are rebuilt into
//! native candidates so the shared extraction runs unchanged.

use super::{bearer, BackendCapabilities, BackendError, HttpRequest, ProviderBackend, ProviderEndpoint};
use crate::constants::endpoints;
use crate::types::{
    parse_data_url, to_data_url, Candidate, ChatCompletion, ChatMessage, ChatRequest,
    ChatResponseContent, Content, ContentPart, FileData, ImageUrlData, NativeRequest,
    NativeResponse, WirePart,
};

/// OpenAI-compatible backend
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatCompletionsBackend;

impl ChatCompletionsBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn static_capabilities() -> BackendCapabilities {
        BackendCapabilities {
            image_output: false,
            vision: true,
            search: false,
        }
    }

    fn endpoint_url(endpoint: &ProviderEndpoint) -> String {
        let base = endpoint.base_url.trim().trim_end_matches('/');
        if base.ends_with(endpoints::CHAT_COMPLETIONS_PATH) {
            base.to_string()
        } else {
            format!("{}{}", base, endpoints::CHAT_COMPLETIONS_PATH)
        }
    }

    /// Restructure native turns into chat messages
    pub fn to_chat_request(model: &str, request: &NativeRequest) -> ChatRequest {
        let messages = request
            .contents
            .iter()
            .filter_map(|content| {
                let parts: Vec<ContentPart> = content.parts.iter().filter_map(to_content_part).collect();
                if parts.is_empty() {
                    return None;
                }
                Some(ChatMessage {
                    role: chat_role(content.role.as_deref()).to_string(),
                    content: parts,
                })
            })
            .collect();

        ChatRequest {
            model: model.trim().to_string(),
            messages,
        }
    }

    /// Rebuild a chat completion as one native response chunk
    pub fn to_native_response(completion: ChatCompletion) -> NativeResponse {
        let candidates = completion
            .choices
            .into_iter()
            .filter_map(|choice| choice.message)
            .map(|message| {
                let mut parts = Vec::new();
                match message.content {
                    Some(ChatResponseContent::Text(text)) => push_text(&mut parts, text),
                    Some(ChatResponseContent::Parts(blocks)) => {
                        for block in blocks {
                            match block {
                                ContentPart::Text { text } => push_text(&mut parts, text),
                                ContentPart::ImageUrl { image_url } => {
                                    parts.push(image_part(image_url.url))
                                }
                            }
                        }
                    }
                    None => {}
                }
                for image in message.images {
                    parts.push(image_part(image.image_url.url));
                }

                Candidate {
                    content: Some(Content::model(parts)),
                    finish_reason: None,
                }
            })
            .collect();

        NativeResponse { candidates }
    }
}

fn chat_role(native_role: Option<&str>) -> &'static str {
    match native_role {
        Some("model") | Some("assistant") => "assistant",
        _ => "user",
    }
}

fn to_content_part(part: &WirePart) -> Option<ContentPart> {
    if part.thought == Some(true) {
        return None;
    }
    if let Some(text) = part.text.as_ref().filter(|text| !text.is_empty()) {
        return Some(ContentPart::Text { text: text.clone() });
    }
    if let Some(blob) = part.inline_data.as_ref().filter(|blob| !blob.data.is_empty()) {
        return Some(ContentPart::ImageUrl {
            image_url: ImageUrlData {
                url: to_data_url(blob),
            },
        });
    }
    part.file_data
        .as_ref()
        .filter(|file| !file.file_uri.is_empty())
        .map(|file| ContentPart::ImageUrl {
            image_url: ImageUrlData {
                url: file.file_uri.clone(),
            },
        })
}

fn push_text(parts: &mut Vec<WirePart>, text: String) {
    if !text.is_empty() {
        parts.push(WirePart::text(text));
    }
}

fn image_part(url: String) -> WirePart {
    match parse_data_url(&url) {
        Some(blob) => WirePart {
            inline_data: Some(blob),
            ..Default::default()
        },
        None => WirePart {
            file_data: Some(FileData {
                mime_type: None,
                file_uri: url,
            }),
            ..Default::default()
        },
    }
}

impl ProviderBackend for ChatCompletionsBackend {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn description(&self) -> &'static str {
        "OpenAI-compatible chat completions (text output only)"
    }

    fn capabilities(&self) -> BackendCapabilities {
        Self::static_capabilities()
    }

    fn prepare(
        &self,
        endpoint: &ProviderEndpoint,
        request: &NativeRequest,
    ) -> Result<HttpRequest, BackendError> {
        let chat = Self::to_chat_request(&endpoint.model, request);
        if chat.messages.is_empty() {
            return Err(BackendError::Encode("request has no messages".to_string()));
        }
        let body = serde_json::to_value(&chat).map_err(|e| BackendError::Encode(e.to_string()))?;

        Ok(HttpRequest {
            url: Self::endpoint_url(endpoint),
            headers: vec![bearer(&endpoint.api_key)],
            body,
        })
    }

    fn decode(&self, body: serde_json::Value) -> Result<Vec<NativeResponse>, BackendError> {
        let completion: ChatCompletion =
            serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(vec![Self::to_native_response(completion)])
    }
}
