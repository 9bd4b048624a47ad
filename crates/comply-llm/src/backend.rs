//! The model backend boundary
//!
//! A backend knows how to upload a document once, run prompts against the
//! upload, and release it. Retry, batching and cleanup live in
//! [`crate::ModelClient`]; backends only report what happened.

use crate::LlmError;
use async_trait::async_trait;
use comply_domain::TokenUsage;
use serde_json::Value;

/// Handle to a document uploaded (and possibly cached) on the provider side
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    /// Provider-side identifier
    pub id: String,

    /// Size of the uploaded document
    pub size_bytes: usize,
}

/// One structured-output request against an uploaded document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionCall {
    /// Short name used for logging and test scripting (e.g. `metadata`)
    pub label: String,

    /// Instruction text
    pub prompt: String,

    /// JSON Schema the response must follow
    pub schema: Value,
}

impl ExtractionCall {
    /// Create a call
    pub fn new(label: impl Into<String>, prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            label: label.into(),
            prompt: prompt.into(),
            schema,
        }
    }
}

/// Raw model output for one call
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    /// Response text, expected to hold JSON
    pub text: String,

    /// Token counts for this call
    pub usage: TokenUsage,
}

/// A generative model that accepts documents and returns structured JSON
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Upload a document for use by later calls
    async fn upload(&self, document: &[u8]) -> Result<DocumentHandle, LlmError>;

    /// Release an upload and any cache built on it
    async fn release(&self, handle: &DocumentHandle) -> Result<(), LlmError>;

    /// Run one call against an uploaded document
    async fn generate(
        &self,
        handle: &DocumentHandle,
        call: &ExtractionCall,
    ) -> Result<ModelResponse, LlmError>;
}
