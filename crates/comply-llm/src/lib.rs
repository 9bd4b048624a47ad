//! Comply Model Invocation Layer
//!
//! Wraps a generative model behind a small backend trait and adds what the
//! extraction pipeline needs on top: retry with exponential backoff, one
//! upload shared by several calls, sequential and parallel batches, and
//! guaranteed release of uploads.
//!
//! # Architecture
//!
//! - [`ModelBackend`]: upload / generate / release against a provider
//! - [`ModelClient`]: retry policy, batching, and scoped uploads
//! - [`MockBackend`]: scripted backend for tests
//!
//! Vendor-specific backends implement [`ModelBackend`] outside this crate.
//!
//! # Examples
//!
//! ```
//! use comply_llm::{ExtractionCall, MockBackend, ModelClient, RetryPolicy};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new(r#"{"metadata": {}}"#);
//! let client = ModelClient::new(backend, RetryPolicy::default());
//!
//! let calls = vec![
//!     ExtractionCall::new("metadata", "Extract report metadata", json!({"type": "object"})),
//!     ExtractionCall::new("controls", "Extract all controls", json!({"type": "object"})),
//! ];
//! let batch = client.extract_batch_sequential(b"%PDF-1.7", &calls).await.unwrap();
//! assert_eq!(batch.values.len(), 2);
//! # });
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod client;
pub mod error;
pub mod mock;
pub mod response;
pub mod retry;

pub use backend::{DocumentHandle, ExtractionCall, ModelBackend, ModelResponse};
pub use client::{BatchOutput, CallOutput, ModelClient, UploadGuard};
pub use error::LlmError;
pub use mock::{FailureKind, MockBackend};
pub use response::parse_structured;
pub use retry::RetryPolicy;
