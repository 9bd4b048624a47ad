//! Scripted backend for deterministic testing
//!
//! Responses are keyed by call label. Failures and delays can be scripted
//! per label, and every upload, release and call is counted so tests can
//! check resource discipline.

use crate::{DocumentHandle, ExtractionCall, LlmError, ModelBackend, ModelResponse};
use async_trait::async_trait;
use comply_domain::TokenUsage;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Kind of failure a scripted call produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `LlmError::RateLimited`
    RateLimited,
    /// `LlmError::Transient`
    Transient,
    /// `LlmError::Terminal`
    Terminal,
}

impl FailureKind {
    fn to_error(self, label: &str) -> LlmError {
        match self {
            FailureKind::RateLimited => LlmError::RateLimited(format!("429 for {}", label)),
            FailureKind::Transient => LlmError::Transient(format!("503 for {}", label)),
            FailureKind::Terminal => LlmError::Terminal(format!("400 for {}", label)),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, String>,
    failures: HashMap<String, (usize, FailureKind)>,
    upload_failures: Option<(usize, FailureKind)>,
    delays: HashMap<String, Duration>,
    calls: HashMap<String, usize>,
    uploads: usize,
    releases: usize,
    live_handles: HashSet<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Mock model backend
///
/// # Examples
///
/// ```
/// use comply_llm::{ExtractionCall, MockBackend, ModelBackend};
///
/// # tokio_test::block_on(async {
/// let backend = MockBackend::new(r#"{"ok": true}"#);
/// backend.add_response("metadata", r#"{"metadata": {}}"#);
///
/// let handle = backend.upload(b"%PDF").await.unwrap();
/// let call = ExtractionCall::new("metadata", "Extract metadata", serde_json::json!({}));
/// let response = backend.generate(&handle, &call).await.unwrap();
/// assert_eq!(response.text, r#"{"metadata": {}}"#);
/// assert_eq!(backend.call_count(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    default_response: String,
    usage: TokenUsage,
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    /// Create a mock that answers every call with the same text
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            default_response: default_response.into(),
            usage: TokenUsage::new(1000, 100, 0),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Set the token usage reported for every call
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Answer calls with the given label with this text
    pub fn add_response(&self, label: impl Into<String>, response: impl Into<String>) {
        lock(&self.state)
            .responses
            .insert(label.into(), response.into());
    }

    /// Fail the next `times` calls with the given label
    pub fn fail_times(&self, label: impl Into<String>, times: usize, kind: FailureKind) {
        lock(&self.state).failures.insert(label.into(), (times, kind));
    }

    /// Fail the next `times` uploads
    pub fn fail_uploads(&self, times: usize, kind: FailureKind) {
        lock(&self.state).upload_failures = Some((times, kind));
    }

    /// Delay calls with the given label
    pub fn set_delay(&self, label: impl Into<String>, delay: Duration) {
        lock(&self.state).delays.insert(label.into(), delay);
    }

    /// Total generate calls, including failed ones
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls.values().sum()
    }

    /// Generate calls made with the given label
    pub fn calls_for(&self, label: &str) -> usize {
        lock(&self.state).calls.get(label).copied().unwrap_or(0)
    }

    /// Upload attempts, including failed ones
    pub fn upload_count(&self) -> usize {
        lock(&self.state).uploads
    }

    /// Releases performed
    pub fn release_count(&self) -> usize {
        lock(&self.state).releases
    }

    /// Uploads that have not been released
    pub fn outstanding_uploads(&self) -> usize {
        lock(&self.state).live_handles.len()
    }

    /// Highest number of concurrent generate calls observed
    pub fn max_in_flight(&self) -> usize {
        lock(&self.state).max_in_flight
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("{}")
    }
}

fn take_failure(slot: &mut Option<(usize, FailureKind)>) -> Option<FailureKind> {
    match slot {
        Some((remaining, kind)) if *remaining > 0 => {
            *remaining -= 1;
            Some(*kind)
        }
        _ => None,
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn upload(&self, document: &[u8]) -> Result<DocumentHandle, LlmError> {
        let mut state = lock(&self.state);
        state.uploads += 1;

        if let Some(kind) = take_failure(&mut state.upload_failures) {
            return Err(match kind {
                FailureKind::Terminal => LlmError::Upload("upload rejected".to_string()),
                other => other.to_error("upload"),
            });
        }

        let id = format!("files/mock-{}", state.uploads);
        state.live_handles.insert(id.clone());

        Ok(DocumentHandle {
            id,
            size_bytes: document.len(),
        })
    }

    async fn release(&self, handle: &DocumentHandle) -> Result<(), LlmError> {
        let mut state = lock(&self.state);
        state.releases += 1;
        state.live_handles.remove(&handle.id);
        Ok(())
    }

    async fn generate(
        &self,
        handle: &DocumentHandle,
        call: &ExtractionCall,
    ) -> Result<ModelResponse, LlmError> {
        let (failure, delay, text) = {
            let mut state = lock(&self.state);
            *state.calls.entry(call.label.clone()).or_insert(0) += 1;

            if !state.live_handles.contains(&handle.id) {
                return Err(LlmError::Terminal(format!(
                    "document {} is not uploaded",
                    handle.id
                )));
            }

            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);

            let mut slot = state.failures.get(&call.label).copied();
            let failure = take_failure(&mut slot);
            if let Some(updated) = slot {
                state.failures.insert(call.label.clone(), updated);
            }

            let delay = state.delays.get(&call.label).copied();
            let text = state
                .responses
                .get(&call.label)
                .cloned()
                .unwrap_or_else(|| self.default_response.clone());

            (failure, delay, text)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        lock(&self.state).in_flight -= 1;

        match failure {
            Some(kind) => Err(kind.to_error(&call.label)),
            None => Ok(ModelResponse {
                text,
                usage: self.usage,
            }),
        }
    }
}
