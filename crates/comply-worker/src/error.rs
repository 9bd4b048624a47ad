//! Error types for job execution

use thiserror::Error;

/// Errors that can occur while running an extraction job
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// The trigger named a document storage does not know
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// The parse failed; carries the orchestrator's message unchanged
    #[error("{0}")]
    Extraction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
