//! Progress reporting during a parse
//!
//! The orchestrator reports fixed checkpoints to a [`ProgressSink`]. Within
//! one parse the reported percentage never decreases, including on failure.

use comply_domain::JobStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Phase of a parse as seen by a progress sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    /// Estimating size and choosing a strategy
    Analyzing,
    /// Model calls in flight
    Extracting,
    /// Merging and scoring
    Processing,
    /// Parse finished
    Complete,
    /// Parse failed
    Failed,
}

impl ProgressPhase {
    /// Get the phase name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Analyzing => "analyzing",
            ProgressPhase::Extracting => "extracting",
            ProgressPhase::Processing => "processing",
            ProgressPhase::Complete => "complete",
            ProgressPhase::Failed => "failed",
        }
    }

    /// Job status a worker records for this phase
    ///
    /// A complete parse still has persistence ahead of it, so it maps to
    /// `mapping` rather than `complete`.
    pub fn job_status(&self) -> JobStatus {
        match self {
            ProgressPhase::Analyzing => JobStatus::Analyzing,
            ProgressPhase::Extracting => JobStatus::Extracting,
            ProgressPhase::Processing => JobStatus::Verifying,
            ProgressPhase::Complete => JobStatus::Mapping,
            ProgressPhase::Failed => JobStatus::Failed,
        }
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Phase reached
    pub phase: ProgressPhase,
    /// Percentage in [0, 100]
    pub percentage: u8,
    /// Human-readable message
    pub message: String,
}

/// Receives progress notifications
pub trait ProgressSink: Send + Sync {
    /// Called at each checkpoint
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Sink that keeps every event, for inspection after a parse
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Percentages received so far
    pub fn percentages(&self) -> Vec<u8> {
        self.events().iter().map(|e| e.percentage).collect()
    }
}

impl ProgressSink for ProgressLog {
    fn on_progress(&self, event: &ProgressEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

/// Forwards events to a sink, clamping percentages to be non-decreasing
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, last: 0 }
    }

    pub(crate) fn emit(&mut self, phase: ProgressPhase, percentage: u8, message: impl Into<String>) {
        self.last = self.last.max(percentage.min(100));
        self.sink.on_progress(&ProgressEvent {
            phase,
            percentage: self.last,
            message: message.into(),
        });
    }

    /// Report failure at the last reached percentage
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.emit(ProgressPhase::Failed, self.last, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_is_monotonic() {
        let log = ProgressLog::new();
        let mut tracker = ProgressTracker::new(&log);

        tracker.emit(ProgressPhase::Analyzing, 5, "a");
        tracker.emit(ProgressPhase::Extracting, 20, "b");
        tracker.emit(ProgressPhase::Extracting, 15, "c");
        tracker.fail("boom");

        assert_eq!(log.percentages(), vec![5, 20, 20, 20]);
        assert_eq!(log.events().last().unwrap().phase, ProgressPhase::Failed);
        assert_eq!(log.events().last().unwrap().message, "boom");
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| seen.lock().unwrap().push(event.phase);
        let mut tracker = ProgressTracker::new(&sink);

        tracker.emit(ProgressPhase::Complete, 150, "done");
        assert_eq!(*seen.lock().unwrap(), vec![ProgressPhase::Complete]);
    }

    #[test]
    fn test_job_status_mapping() {
        assert_eq!(ProgressPhase::Analyzing.job_status(), JobStatus::Analyzing);
        assert_eq!(ProgressPhase::Processing.job_status(), JobStatus::Verifying);
        assert_eq!(ProgressPhase::Complete.job_status(), JobStatus::Mapping);
        assert_eq!(ProgressPhase::Failed.job_status(), JobStatus::Failed);
    }
}
