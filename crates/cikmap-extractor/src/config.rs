//! Configuration for the Extractor

use serde::{Deserialize, Serialize};

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Characters examined on each side of a marker
    pub window_radius: usize,

    /// Apply strict validation to candidates found near a marker
    ///
    /// The whole-document fallback always validates strictly.
    pub strict_validation: bool,

    /// Largest document accepted (bytes)
    pub max_document_bytes: usize,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_document_bytes == 0 {
            return Err("max_document_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration: 200-character window, lenient near markers
    fn default() -> Self {
        Self {
            window_radius: 200,
            strict_validation: false,
            max_document_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ExtractorConfig {
    /// Lenient preset: wider window, trusts anything near a marker
    pub fn lenient() -> Self {
        Self {
            window_radius: 300,
            strict_validation: false,
            max_document_bytes: 50 * 1024 * 1024,
        }
    }

    /// Strict preset: strict validation everywhere
    pub fn strict() -> Self {
        Self {
            window_radius: 200,
            strict_validation: true,
            max_document_bytes: 20 * 1024 * 1024,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
