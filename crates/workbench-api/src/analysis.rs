//! Single-shot chat and analysis operations
//!
//! These go through the same backends as generation but skip the pacing
//! gate and make exactly one call.

use serde::Serialize;
use serde_json::Value;

use crate::config::WorkbenchSettings;
use crate::constants::{messages, prompts};
use crate::error::{Result, WorkbenchError};
use crate::gateway::WorkbenchApi;
use crate::request::{build_analysis_request, build_chat_request, InlineImage};
use crate::response::{extract_output, GeneratedImage, SignedText};
use crate::types::{Content, WirePart};

/// Reply to a conversational turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub text: String,
    /// First signed text fragment, for continuing the conversation
    pub signed_text: Option<SignedText>,
    /// First signature anywhere in the reply
    pub signature: Option<String>,
    pub images: Vec<GeneratedImage>,
}

/// Raw model text plus its JSON reading, when one exists
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub raw_text: String,
    pub parsed: Option<Value>,
}

impl AnalysisResult {
    fn from_text(raw_text: String) -> Self {
        let parsed = parse_json_loose(&raw_text);
        if parsed.is_none() {
            log::debug!("Analysis reply is not JSON; returning raw text only");
        }
        Self { raw_text, parsed }
    }
}

/// Parse a JSON object strictly, then from the first `{` to the last `}`
pub fn parse_json_loose(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn instruction_or<'a>(instruction: Option<&'a str>, default: &'a str) -> &'a str {
    instruction
        .map(str::trim)
        .filter(|instruction| !instruction.is_empty())
        .unwrap_or(default)
}

impl WorkbenchApi {
    /// Multi-turn text completion over the configured protocol
    pub async fn chat(&self, settings: &WorkbenchSettings, contents: &[Content]) -> Result<ChatReply> {
        let native = build_chat_request(contents, settings)?;
        let endpoint = settings.generation_endpoint()?;

        let chunks = self.execute(settings.api_format, &endpoint, &native).await?;
        let output = extract_output(&chunks);
        let signature = output.first_signature();
        Ok(ChatReply {
            text: output.text,
            signed_text: output.signed_text,
            signature,
            images: output.images,
        })
    }

    /// Critique a prompt; `instruction` replaces the default header
    pub async fn analyze_prompt(
        &self,
        settings: &WorkbenchSettings,
        prompt: &str,
        instruction: Option<&str>,
    ) -> Result<AnalysisResult> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(WorkbenchError::validation(messages::EMPTY_ANALYSIS_PROMPT));
        }

        let instruction = instruction_or(instruction, prompts::ANALYZE_PROMPT_INSTRUCTION);
        let native = build_analysis_request(instruction, vec![WirePart::text(prompt)], settings);
        self.analyze(settings, &native).await
    }

    /// Describe an image as a reusable prompt
    pub async fn analyze_image(
        &self,
        settings: &WorkbenchSettings,
        image: &InlineImage,
        instruction: Option<&str>,
    ) -> Result<AnalysisResult> {
        if image.data.trim().is_empty() {
            return Err(WorkbenchError::validation(messages::MISSING_ANALYSIS_IMAGE));
        }

        let instruction = instruction_or(instruction, prompts::ANALYZE_IMAGE_INSTRUCTION);
        let native = build_analysis_request(
            instruction,
            vec![WirePart::inline(&image.mime_type, &image.data)],
            settings,
        );
        self.analyze(settings, &native).await
    }

    async fn analyze(
        &self,
        settings: &WorkbenchSettings,
        native: &crate::types::NativeRequest,
    ) -> Result<AnalysisResult> {
        let endpoint = settings.analysis_endpoint()?;
        log::info!("Running analysis with model {}", endpoint.model);

        let chunks = self.execute(settings.api_format, &endpoint, native).await?;
        Ok(AnalysisResult::from_text(extract_output(&chunks).text))
    }
}
