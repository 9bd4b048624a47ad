//! Model client: retries, shared uploads, and batch execution

use crate::response::parse_structured;
use crate::{DocumentHandle, ExtractionCall, LlmError, ModelBackend, RetryPolicy};
use comply_domain::TokenUsage;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output of a single call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutput {
    /// Parsed JSON object
    pub value: Value,
    /// Token usage for the call
    pub usage: TokenUsage,
}

/// Output of a batch of calls
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    /// Parsed JSON objects, in call order
    pub values: Vec<Value>,
    /// Token usage summed over the batch
    pub usage: TokenUsage,
}

impl BatchOutput {
    fn from_outputs(outputs: Vec<CallOutput>) -> Self {
        let usage = outputs.iter().map(|o| o.usage).sum();
        let values = outputs.into_iter().map(|o| o.value).collect();
        Self { values, usage }
    }
}

/// An upload that is released when the batch ends
///
/// Call [`UploadGuard::release`] on the normal path. If the guard is dropped
/// without that (a cancelled or timed-out batch), release is spawned onto the
/// current runtime.
pub struct UploadGuard<B: ModelBackend + 'static> {
    backend: Arc<B>,
    handle: Option<DocumentHandle>,
}

impl<B: ModelBackend + 'static> UploadGuard<B> {
    fn new(backend: Arc<B>, handle: DocumentHandle) -> Self {
        Self {
            backend,
            handle: Some(handle),
        }
    }

    /// The uploaded document
    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }

    /// Release the upload
    ///
    /// Release failures are logged rather than returned so they never mask
    /// the batch result.
    pub async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            match self.backend.release(&handle).await {
                Ok(()) => debug!("Released document {}", handle.id),
                Err(e) => warn!("Failed to release document {}: {}", handle.id, e),
            }
        }
    }
}

impl<B: ModelBackend + 'static> Drop for UploadGuard<B> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let backend = Arc::clone(&self.backend);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!("Releasing document {} after cancellation", handle.id);
                runtime.spawn(async move {
                    if let Err(e) = backend.release(&handle).await {
                        warn!("Failed to release document {}: {}", handle.id, e);
                    }
                });
            }
            Err(_) => warn!(
                "No async runtime to release document {}; upload leaked",
                handle.id
            ),
        }
    }
}

/// Client that wraps every model call in a retry policy
///
/// # Examples
///
/// ```
/// use comply_llm::{ExtractionCall, MockBackend, ModelClient, RetryPolicy};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let backend = MockBackend::new(r#"{"controls": []}"#);
/// let client = ModelClient::new(backend.clone(), RetryPolicy::no_retry());
///
/// let call = ExtractionCall::new("controls", "Extract all controls", json!({"type": "object"}));
/// let output = client.extract(b"%PDF-1.7", &call).await.unwrap();
/// assert!(output.value["controls"].is_array());
/// assert_eq!(backend.outstanding_uploads(), 0);
/// # });
/// ```
pub struct ModelClient<B: ModelBackend + 'static> {
    backend: Arc<B>,
    policy: RetryPolicy,
}

impl<B: ModelBackend + 'static> Clone for ModelClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            policy: self.policy,
        }
    }
}

impl<B: ModelBackend + 'static> ModelClient<B> {
    /// Create a client owning the backend
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self::from_arc(Arc::new(backend), policy)
    }

    /// Create a client sharing the backend
    pub fn from_arc(backend: Arc<B>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// The retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload a document, retrying transient failures
    pub async fn upload(&self, document: &[u8]) -> Result<UploadGuard<B>, LlmError> {
        let handle = self
            .policy
            .run("upload", || self.backend.upload(document))
            .await?;
        debug!("Uploaded document {} ({} bytes)", handle.id, handle.size_bytes);

        Ok(UploadGuard::new(Arc::clone(&self.backend), handle))
    }

    /// Run one call against an uploaded document
    pub async fn call(
        &self,
        handle: &DocumentHandle,
        call: &ExtractionCall,
    ) -> Result<CallOutput, LlmError> {
        let response = self
            .policy
            .run(&call.label, || self.backend.generate(handle, call))
            .await?;

        let value = parse_structured(&response.text)?;
        debug!(
            "Call {} used {} input / {} output tokens",
            call.label, response.usage.input_tokens, response.usage.output_tokens
        );

        Ok(CallOutput {
            value,
            usage: response.usage,
        })
    }

    /// Upload a document, run one call, release the upload
    pub async fn extract(
        &self,
        document: &[u8],
        call: &ExtractionCall,
    ) -> Result<CallOutput, LlmError> {
        let guard = self.upload(document).await?;
        let outcome = match guard.handle() {
            Some(handle) => self.call(handle, call).await,
            None => Err(LlmError::Upload("upload handle missing".to_string())),
        };
        guard.release().await;
        outcome
    }

    /// Run calls one after another against a single upload
    ///
    /// The first failure aborts the batch.
    pub async fn extract_batch_sequential(
        &self,
        document: &[u8],
        calls: &[ExtractionCall],
    ) -> Result<BatchOutput, LlmError> {
        info!("Running {} sequential calls", calls.len());

        let guard = self.upload(document).await?;
        let outcome = match guard.handle() {
            Some(handle) => self.run_sequential(handle, calls).await,
            None => Err(LlmError::Upload("upload handle missing".to_string())),
        };
        guard.release().await;

        outcome.map(BatchOutput::from_outputs)
    }

    /// Run calls concurrently against a single upload
    ///
    /// Results keep call order. The first failure cancels the remaining calls
    /// and fails the batch.
    pub async fn extract_batch_parallel(
        &self,
        document: &[u8],
        calls: &[ExtractionCall],
    ) -> Result<BatchOutput, LlmError> {
        info!("Running {} parallel calls", calls.len());

        let guard = self.upload(document).await?;
        let outcome = match guard.handle() {
            Some(handle) => try_join_all(calls.iter().map(|call| self.call(handle, call))).await,
            None => Err(LlmError::Upload("upload handle missing".to_string())),
        };
        guard.release().await;

        outcome.map(BatchOutput::from_outputs)
    }

    async fn run_sequential(
        &self,
        handle: &DocumentHandle,
        calls: &[ExtractionCall],
    ) -> Result<Vec<CallOutput>, LlmError> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            outputs.push(self.call(handle, call).await?);
        }
        Ok(outputs)
    }
}
