//! Pluggable provider protocol abstraction
//!
//! Every provider speaks one wire protocol. A backend turns the unified
//! [`NativeRequest`] into an HTTP call for its protocol and turns the JSON
//! reply back into native response chunks, so nothing above this layer
//! ever sees a protocol-specific shape.

pub mod chat;
pub mod native;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::config::ApiFormat;
use crate::types::{NativeRequest, NativeResponse};

pub use chat::ChatCompletionsBackend;
pub use native::NativeBackend;
pub use registry::BackendRegistry;

/// Error types for protocol encode/decode
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),

    #[error("Unexpected response shape: {0}")]
    Decode(String),

    #[error("No backend registered for format {0:?}")]
    NotRegistered(ApiFormat),
}

/// Where and as whom to call a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderEndpoint {
    pub base_url: String,
    /// Path segment before `models/`; unused by chat-completions
    pub api_version: String,
    pub model: String,
    pub api_key: String,
}

/// A fully prepared POST
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl HttpRequest {
    /// URL without its query string, safe to log
    pub fn redacted_url(&self) -> &str {
        self.url
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Capabilities that a protocol may or may not support
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackendCapabilities {
    /// Can return generated images
    pub image_output: bool,
    /// Accepts image input
    pub vision: bool,
    /// Supports the search-grounding tool
    pub search: bool,
}

/// Backend information for settings screens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    pub format: ApiFormat,
    pub name: String,
    pub description: String,
    pub capabilities: BackendCapabilities,
    /// Whether this is the configured format
    pub active: bool,
}

/// The trait every provider protocol implements
pub trait ProviderBackend: Send + Sync {
    // ─── IDENTITY ───────────────────────────────────────────────────

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn capabilities(&self) -> BackendCapabilities;

    // ─── WIRE ───────────────────────────────────────────────────────

    /// Build the HTTP call for a unified request
    fn prepare(
        &self,
        endpoint: &ProviderEndpoint,
        request: &NativeRequest,
    ) -> Result<HttpRequest, BackendError>;

    /// Translate a successful JSON body into native response chunks
    fn decode(&self, body: serde_json::Value) -> Result<Vec<NativeResponse>, BackendError>;
}

pub(crate) fn bearer(api_key: &str) -> (String, String) {
    (
        "Authorization".to_string(),
        format!("Bearer {}", api_key.trim()),
    )
}
