//! Safety threshold normalization

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::SafetySetting;

/// Harm categories sent when safety settings are enabled
pub const HARM_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

/// Blocking threshold for one harm category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyThreshold {
    #[default]
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl SafetyThreshold {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlockNone => "BLOCK_NONE",
            Self::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            Self::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            Self::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }

    /// Parse a configured value; anything unrecognized is `BLOCK_NONE`
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "BLOCK_ONLY_HIGH" => Self::BlockOnlyHigh,
            "BLOCK_MEDIUM_AND_ABOVE" => Self::BlockMediumAndAbove,
            "BLOCK_LOW_AND_ABOVE" => Self::BlockLowAndAbove,
            _ => Self::BlockNone,
        }
    }
}

/// One setting per known category, in a stable order
pub fn build_safety_settings(configured: &BTreeMap<String, String>) -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|category| {
            let threshold = configured
                .get(*category)
                .map(|value| SafetyThreshold::normalize(value))
                .unwrap_or_default();
            SafetySetting {
                category: (*category).to_string(),
                threshold: threshold.as_str().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            SafetyThreshold::normalize(" block_only_high "),
            SafetyThreshold::BlockOnlyHigh
        );
        assert_eq!(SafetyThreshold::normalize("OFF"), SafetyThreshold::BlockNone);
        assert_eq!(SafetyThreshold::normalize(""), SafetyThreshold::BlockNone);
    }

    #[test]
    fn test_build_covers_every_category() {
        let mut configured = BTreeMap::new();
        configured.insert(
            "HARM_CATEGORY_HATE_SPEECH".to_string(),
            "BLOCK_LOW_AND_ABOVE".to_string(),
        );
        configured.insert("HARM_CATEGORY_HARASSMENT".to_string(), "nonsense".to_string());

        let settings = build_safety_settings(&configured);
        assert_eq!(settings.len(), HARM_CATEGORIES.len());
        assert_eq!(settings[0].threshold, "BLOCK_NONE");
        assert_eq!(settings[1].category, "HARM_CATEGORY_HATE_SPEECH");
        assert_eq!(settings[1].threshold, "BLOCK_LOW_AND_ABOVE");
        assert!(settings[2..].iter().all(|s| s.threshold == "BLOCK_NONE"));
    }
}
