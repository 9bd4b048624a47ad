//! Configuration for job execution

use serde::{Deserialize, Serialize};

/// Configuration for the job runner
///
/// # Examples
///
/// ```
/// use comply_worker::WorkerConfig;
///
/// let config = WorkerConfig::default();
/// assert_eq!(config.framework_code, "dora");
/// assert_eq!(config.max_error_message_len, 500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Code of the framework vendor assessments are written against
    /// Default: "dora"
    pub framework_code: String,

    /// Longest job failure message stored, in characters
    /// Default: 500
    pub max_error_message_len: usize,

    /// Write one evidence location per extracted control
    /// Default: true
    pub record_evidence: bool,

    /// Longest extracted text kept on an evidence location, in characters
    /// Default: 2000
    pub evidence_text_limit: usize,

    /// Upsert vendor assessments when the document belongs to a vendor
    /// Default: true
    pub create_assessments: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            framework_code: "dora".to_string(),
            max_error_message_len: 500,
            record_evidence: true,
            evidence_text_limit: 2000,
            create_assessments: true,
        }
    }
}

impl WorkerConfig {
    /// Parse from TOML; missing keys take default values
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(toml_str).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.framework_code.trim().is_empty() {
            return Err("framework_code must not be empty".to_string());
        }

        if self.max_error_message_len == 0 {
            return Err("max_error_message_len must be greater than 0".to_string());
        }

        if self.evidence_text_limit == 0 {
            return Err("evidence_text_limit must be greater than 0".to_string());
        }

        Ok(())
    }
}
