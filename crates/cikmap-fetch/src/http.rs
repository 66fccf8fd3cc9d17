//! HTTP fetch client for the EDGAR archive
//!
//! # Features
//!
//! - One pooled `reqwest` client per fetcher
//! - Identity headers (`User-Agent`, `From`) required by the archive
//! - Retry with exponential backoff on 429 and 5xx gateway/overload statuses
//! - `Retry-After` honored on 429, capped at the backoff ceiling
//! - One governor permit per physical attempt
//!
//! # Examples
//!
//! ```no_run
//! use cikmap_fetch::{FetchConfig, HttpFetcher, RateGovernor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig {
//!     contact_name: "Jane Analyst".to_string(),
//!     contact_email: "jane@example.com".to_string(),
//!     ..FetchConfig::default()
//! };
//! let fetcher = HttpFetcher::new(config)?;
//! let governor = RateGovernor::new(10.0)?;
//!
//! let url = fetcher.index_url(2024, 1);
//! let index = fetcher.fetch_optional(&url, &governor).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::governor::RateGovernor;
use crate::Fetcher;
use async_trait::async_trait;
use cikmap_domain::{FetchOutcome, FilingDescriptor};
use reqwest::header::{HeaderMap, HeaderValue, FROM, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Statuses retried with backoff
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Archive fetch client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher, validating the configuration
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        config.validate().map_err(FetchError::Config)?;

        let user_agent = format!(
            "cikmap/{} {} {}",
            env!("CARGO_PKG_VERSION"),
            config.contact_name.trim(),
            config.contact_email.trim()
        )
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|e| FetchError::Config(format!("Invalid User-Agent: {}", e)))?,
        );
        headers.insert(
            FROM,
            HeaderValue::from_str(config.contact_email.trim())
                .map_err(|e| FetchError::Config(format!("Invalid From header: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            user_agent,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// User-Agent sent with every request
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// URL of a filing's full text submission
    pub fn filing_url(&self, cik: &str, accession: &str) -> String {
        self.config.archive_url(&format!(
            "edgar/data/{}/{}.txt",
            cik.trim_start_matches('0'),
            accession
        ))
    }

    /// URL of a quarterly master index
    pub fn index_url(&self, year: u16, quarter: u8) -> String {
        self.config
            .archive_url(&format!("edgar/full-index/{}/QTR{}/master.idx", year, quarter))
    }

    /// GET a URL as text, retrying transient failures
    pub async fn get_text(&self, url: &str, governor: &RateGovernor) -> Result<String, FetchError> {
        match self.get_with_retry(url, governor, false).await? {
            Some(body) => Ok(body),
            None => Err(FetchError::Permanent {
                attempts: 1,
                status: Some(404),
                message: format!("HTTP 404 Not Found for {}", url),
            }),
        }
    }

    /// GET a URL as text, mapping 404 to `None`
    pub async fn fetch_optional(
        &self,
        url: &str,
        governor: &RateGovernor,
    ) -> Result<Option<String>, FetchError> {
        self.get_with_retry(url, governor, true).await
    }

    async fn get_with_retry(
        &self,
        url: &str,
        governor: &RateGovernor,
        missing_ok: bool,
    ) -> Result<Option<String>, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_status = None;
        let mut last_message = String::new();

        while attempts < max_attempts {
            attempts += 1;
            governor.acquire(1).await;

            let retry_after = match self.attempt(url, missing_ok).await {
                Ok(body) => {
                    debug!("Fetched {} in {} attempt(s)", url, attempts);
                    return Ok(body);
                }
                Err(FetchError::Transient {
                    status,
                    message,
                    retry_after,
                }) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempts, max_attempts, url, message
                    );
                    last_status = status.or(last_status);
                    last_message = message;
                    retry_after
                }
                Err(FetchError::Permanent {
                    status, message, ..
                }) => {
                    return Err(FetchError::Permanent {
                        attempts,
                        status,
                        message,
                    });
                }
                Err(other) => return Err(other),
            };

            if attempts < max_attempts {
                let delay = match retry_after {
                    Some(requested) => {
                        requested.min(Duration::from_millis(self.config.backoff_max_ms))
                    }
                    None => self.config.backoff_delay(attempts),
                };
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            status: last_status,
            message: last_message,
        })
    }

    /// One physical request, classified
    async fn attempt(&self, url: &str, missing_ok: bool) -> Result<Option<String>, FetchError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(FetchError::Permanent {
                    attempts: 1,
                    status: None,
                    message: format!("Invalid request for {}: {}", url, e),
                });
            }
            Err(e) => {
                return Err(FetchError::Transient {
                    status: None,
                    message: format!("Request failed: {}", e),
                    retry_after: None,
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            return response
                .text()
                .await
                .map(Some)
                .map_err(|e| FetchError::Transient {
                    status: Some(status.as_u16()),
                    message: format!("Failed to read body: {}", e),
                    retry_after: None,
                });
        }

        if status == StatusCode::NOT_FOUND && missing_ok {
            return Ok(None);
        }

        let code = status.as_u16();
        if RETRYABLE_STATUSES.contains(&code) {
            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
            } else {
                None
            };
            return Err(FetchError::Transient {
                status: Some(code),
                message: format!("HTTP {}", status),
                retry_after,
            });
        }

        Err(FetchError::Permanent {
            attempts: 1,
            status: Some(code),
            message: format!("HTTP {} for {}", status, url),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, descriptor: &FilingDescriptor, governor: &RateGovernor) -> FetchOutcome {
        match self.get_text(&descriptor.fetch_target, governor).await {
            Ok(body) => FetchOutcome::success(descriptor.clone(), body),
            Err(e) => {
                warn!("Fetch failed for {}: {}", descriptor.item_key, e);
                FetchOutcome::failure(descriptor.clone(), e.into_failure())
            }
        }
    }
}
