//! Workbench settings
//!
//! A read-only snapshot of these settings is passed into every call.
//! Persistence is a plain `settings.json` in the app data directory.

use std::collections::BTreeMap;
use std::path::Path;

use prompt_parts::AttachmentPolicy;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::backend::ProviderEndpoint;
use crate::constants::{defaults, messages};
use crate::error::{Result, WorkbenchError};

const SETTINGS_FILE: &str = "settings.json";

/// Which wire protocol to speak
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    /// Native multi-part `generateContent` protocol
    #[default]
    Gemini,
    /// Chat-completions protocol
    #[serde(alias = "openai-chat")]
    OpenAi,
}

/// Endpoint overrides for analysis calls; empty fields fall back to the
/// main native settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    pub base_url: String,
    pub api_version: String,
    pub model: String,
    pub api_key: String,
}

/// Default output image hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageDefaults {
    /// `W:H` or `auto`
    pub aspect_ratio: String,
    /// `1K`, `2K` or `4K`
    pub image_size: String,
}

/// Full workbench configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkbenchSettings {
    pub api_format: ApiFormat,
    pub base_url: String,
    pub api_version: String,
    pub model: String,
    pub api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_api_key: String,
    pub analysis: AnalysisSettings,
    pub enable_google_search: bool,
    pub enable_safety_settings: bool,
    /// Harm category -> threshold name
    pub safety_settings: BTreeMap<String, String>,
    pub image_config: ImageDefaults,
    pub attachments: AttachmentPolicy,
    pub min_generation_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for WorkbenchSettings {
    fn default() -> Self {
        Self {
            api_format: ApiFormat::default(),
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            api_version: defaults::GEMINI_API_VERSION.to_string(),
            model: defaults::GEMINI_IMAGE_MODEL.to_string(),
            api_key: String::new(),
            openai_base_url: defaults::OPENAI_BASE_URL.to_string(),
            openai_model: defaults::OPENAI_MODEL.to_string(),
            openai_api_key: String::new(),
            analysis: AnalysisSettings {
                model: defaults::ANALYSIS_MODEL.to_string(),
                ..Default::default()
            },
            enable_google_search: false,
            enable_safety_settings: true,
            safety_settings: BTreeMap::new(),
            image_config: ImageDefaults::default(),
            attachments: AttachmentPolicy::default(),
            min_generation_interval_ms: defaults::MIN_GENERATION_INTERVAL_MS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl WorkbenchSettings {
    /// Load settings from disk, or defaults when no file exists yet
    pub async fn load(app_data_dir: &Path) -> std::result::Result<Self, ConfigError> {
        let path = app_data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).await?;
        let settings = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        log::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, app_data_dir: &Path) -> std::result::Result<(), ConfigError> {
        fs::create_dir_all(app_data_dir).await?;

        let path = app_data_dir.join(SETTINGS_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&path, contents).await?;

        log::info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Endpoint for generation and chat in the active format
    pub fn generation_endpoint(&self) -> Result<ProviderEndpoint> {
        let endpoint = match self.api_format {
            ApiFormat::Gemini => ProviderEndpoint {
                base_url: self.base_url.clone(),
                api_version: self.api_version.clone(),
                model: self.model.clone(),
                api_key: self.api_key.clone(),
            },
            ApiFormat::OpenAi => self.openai_endpoint(),
        };
        endpoint.validated()
    }

    /// Endpoint for analysis calls; analysis overrides apply to the native
    /// protocol only
    pub fn analysis_endpoint(&self) -> Result<ProviderEndpoint> {
        let endpoint = match self.api_format {
            ApiFormat::Gemini => ProviderEndpoint {
                base_url: or_fallback(&self.analysis.base_url, &self.base_url),
                api_version: or_fallback(&self.analysis.api_version, &self.api_version),
                model: or_fallback(&self.analysis.model, &self.model),
                api_key: or_fallback(&self.analysis.api_key, &self.api_key),
            },
            ApiFormat::OpenAi => self.openai_endpoint(),
        };
        endpoint.validated()
    }

    fn openai_endpoint(&self) -> ProviderEndpoint {
        ProviderEndpoint {
            base_url: self.openai_base_url.clone(),
            api_version: String::new(),
            model: self.openai_model.clone(),
            api_key: self.openai_api_key.clone(),
        }
    }
}

fn or_fallback(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.trim().to_string()
    } else {
        value.to_string()
    }
}

impl ProviderEndpoint {
    fn validated(self) -> Result<Self> {
        if self.api_key.trim().is_empty() {
            return Err(WorkbenchError::validation(messages::MISSING_API_KEY));
        }
        if self.model.trim().is_empty() {
            return Err(WorkbenchError::validation(messages::MISSING_MODEL));
        }
        Ok(self)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(serde_json::Error),
}
