//! Error types for the extraction pipeline

use comply_llm::LlmError;
use thiserror::Error;

/// Errors that can occur while parsing a report
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Model invocation failed
    #[error("Model error: {0}")]
    Llm(String),

    /// A model call returned JSON without a required section
    #[error("Missing required section '{section}' in {call} result")]
    MissingSection {
        /// Label of the call that produced the result
        call: String,
        /// Name of the missing section
        section: String,
    },

    /// A section was present but had the wrong shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The number of call results does not match the strategy
    #[error("Merge error: {0}")]
    Merge(String),

    /// The extraction phase did not finish in time
    #[error("Extraction timed out after {0}s")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A backend or progress sink panicked during the parse
    #[error("Extraction aborted: {0}")]
    Aborted(String),
}

impl From<LlmError> for ExtractorError {
    fn from(e: LlmError) -> Self {
        ExtractorError::Llm(e.to_string())
    }
}
