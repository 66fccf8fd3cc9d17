//! Configuration for the fetch client

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default archive host
pub const DEFAULT_BASE_URL: &str = "https://www.sec.gov";

/// Configuration for `HttpFetcher`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Contact name sent in the User-Agent
    pub contact_name: String,

    /// Contact email sent in the User-Agent and From headers
    pub contact_email: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Attempts per request, including the first
    pub max_attempts: u32,

    /// First retry delay (milliseconds), doubled on each retry
    pub backoff_base_ms: u64,

    /// Upper bound for any retry delay, `Retry-After` included (milliseconds)
    pub backoff_max_ms: u64,

    /// Archive host, without a trailing slash
    pub base_url: String,
}

impl FetchConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of a path under the archive root
    ///
    /// Index files list filings relative to the root (`edgar/data/...`).
    ///
    /// ```
    /// use cikmap_fetch::FetchConfig;
    ///
    /// let config = FetchConfig::default();
    /// assert_eq!(
    ///     config.archive_url("edgar/data/1/0000000001-24-000001.txt"),
    ///     "https://www.sec.gov/Archives/edgar/data/1/0000000001-24-000001.txt"
    /// );
    /// ```
    pub fn archive_url(&self, path: &str) -> String {
        format!(
            "{}/Archives/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Delay before retry number `attempt` (1-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use cikmap_fetch::FetchConfig;
    /// use std::time::Duration;
    ///
    /// let config = FetchConfig::default();
    /// assert_eq!(config.backoff_delay(1), Duration::from_millis(500));
    /// assert_eq!(config.backoff_delay(3), Duration::from_millis(2000));
    /// assert_eq!(config.backoff_delay(10), Duration::from_millis(8000));
    /// ```
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.backoff_base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.backoff_max_ms))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.contact_email.trim().is_empty() {
            return Err(
                "contact_email is required (set SEC_EMAIL or [fetch].contact_email)".to_string(),
            );
        }
        if !self.contact_email.contains('@') {
            return Err(format!(
                "contact_email '{}' is not an email address",
                self.contact_email
            ));
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err("backoff_max_ms must not be less than backoff_base_ms".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url '{}' must be an http(s) URL", self.base_url));
        }
        Ok(())
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

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            contact_name: String::new(),
            contact_email: String::new(),
            timeout_secs: 60,
            max_attempts: 5,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}
