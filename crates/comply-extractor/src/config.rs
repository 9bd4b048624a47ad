//! Configuration for the extraction pipeline

use comply_llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parser version recorded with every persisted record
pub const PARSER_VERSION: &str = "3.0.0-optimized";

/// Retry settings for model calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per call, including the first
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,

    /// Ceiling on any single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5_000,
            max_delay_ms: 60_000,
        }
    }
}

impl RetrySettings {
    /// Build the retry policy for the model client
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Configuration for the extraction orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Largest estimated page count extracted in a single call
    pub single_pass_max_pages: usize,

    /// Largest estimated page count extracted in two calls
    pub two_pass_max_pages: usize,

    /// Bytes assumed per page when estimating size
    pub bytes_per_page: usize,

    /// Model tokens assumed per page
    pub tokens_per_page: usize,

    /// Maximum time for the extraction phase (seconds)
    pub extraction_timeout_secs: u64,

    /// Confidence given to controls the model did not score
    pub default_control_confidence: f64,

    /// Version tag written to persisted records
    pub parser_version: String,

    /// Retry settings for model calls
    pub retry: RetrySettings,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            single_pass_max_pages: 80,
            two_pass_max_pages: 150,
            bytes_per_page: 50_000,
            tokens_per_page: 258,
            extraction_timeout_secs: 900,
            default_control_confidence: 0.9,
            parser_version: PARSER_VERSION.to_string(),
            retry: RetrySettings::default(),
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: fewer retries and a shorter timeout
    pub fn aggressive() -> Self {
        Self {
            extraction_timeout_secs: 300,
            retry: RetrySettings {
                max_attempts: 2,
                base_delay_ms: 1_000,
                max_delay_ms: 10_000,
            },
            ..Self::default()
        }
    }

    /// Lenient preset: more retries and a longer timeout
    pub fn lenient() -> Self {
        Self {
            extraction_timeout_secs: 1_800,
            retry: RetrySettings {
                max_attempts: 5,
                base_delay_ms: 5_000,
                max_delay_ms: 120_000,
            },
            ..Self::default()
        }
    }

    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.single_pass_max_pages == 0 {
            return Err("single_pass_max_pages must be greater than 0".to_string());
        }
        if self.single_pass_max_pages >= self.two_pass_max_pages {
            return Err(
                "single_pass_max_pages must be less than two_pass_max_pages".to_string(),
            );
        }
        if self.bytes_per_page == 0 {
            return Err("bytes_per_page must be greater than 0".to_string());
        }
        if self.tokens_per_page == 0 {
            return Err("tokens_per_page must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.default_control_confidence) {
            return Err(format!(
                "default_control_confidence {} out of range [0.0, 1.0]",
                self.default_control_confidence
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be greater than 0".to_string());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err("retry.base_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
