//! Coverage error types

use thiserror::Error;

/// Errors that can occur while loading mappings or scoring configuration
#[derive(Error, Debug)]
pub enum CoverageError {
    /// Failed to read a mapping or config file
    #[error("Failed to read {0}")]
    Io(String),

    /// Failed to parse TOML
    #[error("Parse error: {0}")]
    Parse(String),

    /// Mapping table violates an invariant
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// Scoring configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}
