//! Configuration for pipeline runs
//!
//! Defines the request rate, the worker pools and the hand-off buffer.

use cikmap_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a pipeline run
///
/// # Examples
///
/// ```
/// use cikmap_pipeline::PipelineConfig;
///
/// // Default configuration (balanced)
/// let config = PipelineConfig::default();
/// assert_eq!(config.rate_per_second, 10.0);
///
/// // More workers, same archive rate
/// let config = PipelineConfig::aggressive();
/// assert_eq!(config.fetch_workers, 8);
///
/// // Half the archive rate
/// let config = PipelineConfig::polite();
/// assert_eq!(config.rate_per_second, 5.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Outbound requests per second
    /// Default: 10 (the archive's published ceiling)
    pub rate_per_second: f64,

    /// Token-bucket capacity
    /// Default: 1 (at most rate + 1 requests in any one-second window)
    pub burst: f64,

    /// Concurrent fetch workers
    pub fetch_workers: usize,

    /// Concurrent parse workers
    pub parse_workers: usize,

    /// Fetched documents held between the pools before fetchers block
    pub buffer_capacity: usize,

    /// Re-fetch items already present in the resume ledger
    pub force_refetch: bool,

    /// Extractor settings (`window_radius`, `strict_validation`, ...)
    pub extractor: ExtractorConfig,
}

impl Default for PipelineConfig {
    /// Balanced defaults: 10 req/s, 4 fetchers, 4 parsers, buffer of 16
    fn default() -> Self {
        Self {
            rate_per_second: 10.0,
            burst: 1.0,
            fetch_workers: 4,
            parse_workers: 4,
            buffer_capacity: 16,
            force_refetch: false,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Aggressive configuration: more workers and a deeper buffer
    ///
    /// The rate stays at the archive ceiling; extra fetchers only help when
    /// latency, not the governor, is the bottleneck.
    pub fn aggressive() -> Self {
        Self {
            rate_per_second: 10.0,
            burst: 1.0,
            fetch_workers: 8,
            parse_workers: 8,
            buffer_capacity: 32,
            force_refetch: false,
            extractor: ExtractorConfig::default(),
        }
    }

    /// Polite configuration: half the archive rate, small pools
    pub fn polite() -> Self {
        Self {
            rate_per_second: 5.0,
            burst: 1.0,
            fetch_workers: 2,
            parse_workers: 2,
            buffer_capacity: 8,
            force_refetch: false,
            extractor: ExtractorConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.rate_per_second.is_finite() || self.rate_per_second <= 0.0 {
            return Err(format!(
                "rate_per_second must be a positive number, got {}",
                self.rate_per_second
            ));
        }
        if !self.burst.is_finite() || self.burst < 1.0 || self.burst > self.rate_per_second.max(1.0)
        {
            return Err(format!(
                "burst must be between 1 and rate_per_second, got {}",
                self.burst
            ));
        }
        if self.fetch_workers == 0 {
            return Err("fetch_workers must be at least 1".to_string());
        }
        if self.parse_workers == 0 {
            return Err("parse_workers must be at least 1".to_string());
        }
        if self.buffer_capacity == 0 {
            return Err("buffer_capacity must be at least 1".to_string());
        }
        self.extractor.validate()
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
