//! Provider-agnostic request assembly
//!
//! Everything here produces a [`NativeRequest`]; the chat-completions
//! backend restructures it at the wire boundary.

use once_cell::sync::Lazy;
use prompt_parts::PromptPart;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::WorkbenchSettings;
use crate::constants::{messages, prompts};
use crate::error::{Result, WorkbenchError};
use crate::safety::build_safety_settings;
use crate::types::{Content, GenerationConfig, ImageConfig, NativeRequest, Tool, WirePart};

const IMAGE_SIZES: [&str; 3] = ["1K", "2K", "4K"];
const AUTO_RATIO: &str = "auto";

static RATIO_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d+:\d+$").ok());

/// Base64 image carried outside the prompt parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// One generation call as the caller describes it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    /// Plain prompt, used when `parts` is empty
    pub prompt: String,
    /// Structured prompt, sent 1:1 in order
    pub parts: Vec<PromptPart>,
    pub negative_prompt: String,
    pub reference_image: Option<InlineImage>,
    /// `1K`, `2K` or `4K`; invalid values fall back to settings
    pub image_size: Option<String>,
    /// `W:H` or `auto`; invalid values fall back to settings
    pub aspect_ratio: Option<String>,
    /// Full multi-turn override replacing the assembled turn
    pub contents: Option<Vec<Content>>,
}

impl GenerationRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn from_parts(parts: Vec<PromptPart>) -> Self {
        Self {
            parts,
            ..Default::default()
        }
    }

    fn raw_contents(&self) -> Option<&[Content]> {
        self.contents
            .as_deref()
            .filter(|contents| !contents.is_empty())
    }

    fn has_usable_prompt(&self) -> bool {
        !self.prompt.trim().is_empty() || !self.parts.is_empty() || self.raw_contents().is_some()
    }
}

/// Build the native request for an image generation call
pub fn build_generation_request(
    request: &GenerationRequest,
    settings: &WorkbenchSettings,
) -> Result<NativeRequest> {
    if !request.has_usable_prompt() {
        return Err(WorkbenchError::validation(messages::EMPTY_PROMPT));
    }

    let contents = match request.raw_contents() {
        Some(contents) => contents.to_vec(),
        None => vec![Content::user(assemble_parts(request))],
    };

    let mut native = NativeRequest {
        contents,
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            image_config: resolve_image_config(request, settings),
        }),
        ..Default::default()
    };
    apply_common(&mut native, settings);
    Ok(native)
}

/// Build a text-only multi-turn request
pub fn build_chat_request(contents: &[Content], settings: &WorkbenchSettings) -> Result<NativeRequest> {
    let contents: Vec<Content> = contents
        .iter()
        .filter(|content| !content.parts.is_empty())
        .cloned()
        .collect();
    if contents.is_empty() {
        return Err(WorkbenchError::validation(messages::EMPTY_CONVERSATION));
    }

    let mut native = NativeRequest {
        contents,
        ..Default::default()
    };
    apply_common(&mut native, settings);
    Ok(native)
}

/// Build a single-turn analysis request with the instruction header first
pub fn build_analysis_request(
    instruction: &str,
    parts: Vec<WirePart>,
    settings: &WorkbenchSettings,
) -> NativeRequest {
    let mut turn = Vec::with_capacity(parts.len() + 1);
    turn.push(WirePart::text(instruction));
    turn.extend(parts);

    let mut native = NativeRequest {
        contents: vec![Content::user(turn)],
        ..Default::default()
    };
    apply_common(&mut native, settings);
    native
}

fn assemble_parts(request: &GenerationRequest) -> Vec<WirePart> {
    let mut parts = Vec::new();

    if let Some(reference) = request
        .reference_image
        .as_ref()
        .filter(|image| is_image_payload(&image.mime_type, &image.data))
    {
        parts.push(WirePart::text(prompts::REFERENCE_IMAGE_LEAD));
        parts.push(WirePart::inline(&reference.mime_type, &reference.data));
    }

    if request.parts.is_empty() {
        if !request.prompt.trim().is_empty() {
            parts.push(WirePart::text(&request.prompt));
        }
    } else {
        for part in &request.parts {
            match part {
                PromptPart::Text { text } if !text.is_empty() => parts.push(WirePart::text(text)),
                PromptPart::Text { .. } => {}
                PromptPart::Image(image) if is_image_payload(&image.mime_type, &image.data) => {
                    parts.push(WirePart::inline(&image.mime_type, &image.data))
                }
                PromptPart::Image(image) => {
                    log::debug!("Dropping image part {} without usable data", image.id);
                }
            }
        }
    }

    let negative = request.negative_prompt.trim();
    if !negative.is_empty() {
        parts.push(WirePart::text(format!(
            "{}{}",
            prompts::NEGATIVE_PROMPT_MARKER,
            negative
        )));
    }

    if parts.is_empty() {
        parts.push(WirePart::text(prompts::FALLBACK_INSTRUCTION));
    }
    parts
}

fn is_image_payload(mime_type: &str, data: &str) -> bool {
    !data.is_empty() && mime_type.starts_with("image/")
}

fn apply_common(native: &mut NativeRequest, settings: &WorkbenchSettings) {
    if settings.enable_safety_settings {
        native.safety_settings = build_safety_settings(&settings.safety_settings);
    }
    if settings.enable_google_search {
        native.tools.push(Tool::google_search());
    }
}

// ─── IMAGE HINTS ────────────────────────────────────────────────────

/// A validated aspect ratio; `Auto` leaves the choice to the model
#[derive(Debug, Clone, PartialEq, Eq)]
enum AspectChoice {
    Auto,
    Fixed(String),
}

fn parse_image_size(value: &str) -> Option<String> {
    let size = value.trim().to_ascii_uppercase();
    IMAGE_SIZES.contains(&size.as_str()).then_some(size)
}

fn parse_aspect_ratio(value: &str) -> Option<AspectChoice> {
    let ratio = value.trim();
    if ratio.eq_ignore_ascii_case(AUTO_RATIO) {
        return Some(AspectChoice::Auto);
    }
    let pattern = RATIO_PATTERN.as_ref()?;
    pattern
        .is_match(ratio)
        .then(|| AspectChoice::Fixed(ratio.to_string()))
}

fn resolve_image_config(
    request: &GenerationRequest,
    settings: &WorkbenchSettings,
) -> Option<ImageConfig> {
    let image_size = request
        .image_size
        .as_deref()
        .and_then(parse_image_size)
        .or_else(|| parse_image_size(&settings.image_config.image_size));

    let aspect_ratio = request
        .aspect_ratio
        .as_deref()
        .and_then(parse_aspect_ratio)
        .or_else(|| parse_aspect_ratio(&settings.image_config.aspect_ratio))
        .and_then(|choice| match choice {
            AspectChoice::Auto => None,
            AspectChoice::Fixed(ratio) => Some(ratio),
        });

    if image_size.is_none() && aspect_ratio.is_none() {
        return None;
    }
    Some(ImageConfig {
        aspect_ratio,
        image_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_parts::ImagePart;

    fn settings() -> WorkbenchSettings {
        WorkbenchSettings {
            api_key: "key".into(),
            enable_safety_settings: false,
            ..Default::default()
        }
    }

    fn image(id: &str, mime: &str, data: &str) -> PromptPart {
        PromptPart::Image(ImagePart {
            id: id.into(),
            data: data.into(),
            mime_type: mime.into(),
            annotation: None,
        })
    }

    fn texts(native: &NativeRequest) -> Vec<Option<String>> {
        native.contents[0]
            .parts
            .iter()
            .map(|part| part.text.clone())
            .collect()
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let err = build_generation_request(&GenerationRequest::from_prompt("   "), &settings())
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::Validation(_)));

        let empty_override = GenerationRequest {
            contents: Some(Vec::new()),
            ..Default::default()
        };
        assert!(build_generation_request(&empty_override, &settings()).is_err());
    }

    #[test]
    fn test_parts_sent_in_order_and_bad_images_dropped() {
        let request = GenerationRequest {
            parts: vec![
                PromptPart::text("a fox like "),
                image("img-1", "image/png", "AAA"),
                PromptPart::text(" next to "),
                image("img-2", "application/pdf", "BBB"),
                image("img-3", "image/jpeg", ""),
            ],
            negative_prompt: " blur ".into(),
            ..Default::default()
        };
        let native = build_generation_request(&request, &settings()).unwrap();
        let parts = &native.contents[0].parts;

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].text.as_deref(), Some("a fox like "));
        assert_eq!(parts[1].inline_data.as_ref().unwrap().data, "AAA");
        assert_eq!(parts[2].text.as_deref(), Some(" next to "));
        assert_eq!(
            parts[3].text.as_deref(),
            Some(format!("{}blur", prompts::NEGATIVE_PROMPT_MARKER).as_str())
        );
        assert_eq!(native.contents[0].role.as_deref(), Some("user"));
    }

    #[test]
    fn test_reference_image_leads() {
        let request = GenerationRequest {
            prompt: "make it blue".into(),
            reference_image: Some(InlineImage {
                mime_type: "image/png".into(),
                data: "REF".into(),
            }),
            ..Default::default()
        };
        let native = build_generation_request(&request, &settings()).unwrap();
        assert_eq!(
            texts(&native),
            vec![
                Some(prompts::REFERENCE_IMAGE_LEAD.to_string()),
                None,
                Some("make it blue".to_string())
            ]
        );
    }

    #[test]
    fn test_degenerate_parts_fall_back_to_instruction() {
        let request = GenerationRequest::from_parts(vec![image("img-1", "image/png", "")]);
        let native = build_generation_request(&request, &settings()).unwrap();
        assert_eq!(
            texts(&native),
            vec![Some(prompts::FALLBACK_INSTRUCTION.to_string())]
        );
    }

    #[test]
    fn test_image_only_parts_are_sent_without_fallback() {
        let request = GenerationRequest::from_parts(vec![image("i", "image/png", "AAA")]);
        let native = build_generation_request(&request, &settings()).unwrap();
        let parts = &native.contents[0].parts;

        assert_eq!(parts.len(), 1);
        let inline = parts[0].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "AAA");
        assert!(parts[0].text.is_none());
    }

    #[test]
    fn test_raw_contents_override() {
        let contents = vec![
            Content::user(vec![WirePart::text("first")]),
            Content::model(vec![WirePart::text("ok")]),
            Content::user(vec![WirePart::text("again")]),
        ];
        let request = GenerationRequest {
            prompt: "ignored".into(),
            contents: Some(contents.clone()),
            ..Default::default()
        };
        let native = build_generation_request(&request, &settings()).unwrap();
        assert_eq!(native.contents, contents);
    }

    #[test]
    fn test_image_hints_layer_over_defaults() {
        let mut settings = settings();
        settings.image_config.image_size = "2K".into();
        settings.image_config.aspect_ratio = "16:9".into();

        let request = GenerationRequest {
            prompt: "x".into(),
            image_size: Some("4k".into()),
            aspect_ratio: Some("wide".into()),
            ..Default::default()
        };
        let config = build_generation_request(&request, &settings)
            .unwrap()
            .generation_config
            .unwrap();
        assert_eq!(config.response_modalities, vec!["TEXT", "IMAGE"]);
        let image_config = config.image_config.unwrap();
        assert_eq!(image_config.image_size.as_deref(), Some("4K"));
        assert_eq!(image_config.aspect_ratio.as_deref(), Some("16:9"));

        let auto = GenerationRequest {
            prompt: "x".into(),
            image_size: Some("8K".into()),
            aspect_ratio: Some("auto".into()),
            ..Default::default()
        };
        let image_config = build_generation_request(&auto, &settings)
            .unwrap()
            .generation_config
            .unwrap()
            .image_config
            .unwrap();
        assert_eq!(image_config.image_size.as_deref(), Some("2K"));
        assert_eq!(image_config.aspect_ratio, None);
    }

    #[test]
    fn test_no_hints_omits_image_config() {
        let native = build_generation_request(&GenerationRequest::from_prompt("x"), &settings()).unwrap();
        assert!(native.generation_config.unwrap().image_config.is_none());
    }

    #[test]
    fn test_safety_and_search_toggles() {
        let mut settings = settings();
        let native = build_generation_request(&GenerationRequest::from_prompt("x"), &settings).unwrap();
        assert!(native.safety_settings.is_empty());
        assert!(native.tools.is_empty());

        settings.enable_safety_settings = true;
        settings.enable_google_search = true;
        let native = build_generation_request(&GenerationRequest::from_prompt("x"), &settings).unwrap();
        assert_eq!(native.safety_settings.len(), crate::safety::HARM_CATEGORIES.len());
        assert_eq!(native.tools, vec![Tool::google_search()]);
    }

    #[test]
    fn test_chat_request_requires_turns() {
        let err = build_chat_request(&[Content::user(Vec::new())], &settings()).unwrap_err();
        assert_eq!(err.to_string(), messages::EMPTY_CONVERSATION);
    }

    #[test]
    fn test_analysis_request_puts_instruction_first() {
        let native = build_analysis_request("describe", vec![WirePart::inline("image/png", "AAA")], &settings());
        assert_eq!(native.contents.len(), 1);
        assert_eq!(native.contents[0].parts[0].text.as_deref(), Some("describe"));
        assert!(native.contents[0].parts[1].inline_data.is_some());
        assert!(native.generation_config.is_none());
    }
}
