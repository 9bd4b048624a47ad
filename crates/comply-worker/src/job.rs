//! Job triggers, acknowledgements and outcomes

use crate::WorkerError;
use comply_domain::ExtractionStrategy;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Request to extract one document, as received by the inbound trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTrigger {
    /// Document to parse
    pub document_id: String,
    /// Job tracking the parse
    pub job_id: String,
    /// Organization that owns the document
    pub organization_id: String,
}

impl ExtractionTrigger {
    /// Create a trigger
    pub fn new(
        document_id: impl Into<String>,
        job_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            job_id: job_id.into(),
            organization_id: organization_id.into(),
        }
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// A new record was stored
    Completed {
        /// Stored record id
        record_id: String,
        /// Controls extracted
        extracted_controls: usize,
        /// Strategy used
        strategy: ExtractionStrategy,
        /// Model calls made
        calls_made: usize,
        /// Overall coverage score
        overall_score: Option<f64>,
        /// Vendor assessment rows written
        assessments_written: usize,
        /// Wall-clock time of the job
        elapsed_ms: u64,
    },

    /// The document already had a record; nothing was extracted
    AlreadyParsed {
        /// Existing record id
        record_id: String,
    },

    /// The job failed and was marked failed in storage
    Failed {
        /// Message stored on the job
        error: String,
        /// Wall-clock time of the job
        elapsed_ms: u64,
    },
}

impl JobOutcome {
    /// Whether the job ended with a record in storage
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed { .. })
    }

    /// Id of the record the job ended with, if any
    pub fn record_id(&self) -> Option<&str> {
        match self {
            JobOutcome::Completed { record_id, .. } | JobOutcome::AlreadyParsed { record_id } => {
                Some(record_id)
            }
            JobOutcome::Failed { .. } => None,
        }
    }
}

/// Immediate acknowledgement of an enqueued job
///
/// The job runs on its own task; its outcome is reported through job status
/// in storage and can also be awaited here.
#[derive(Debug)]
pub struct JobAck {
    /// Job that was accepted
    pub job_id: String,
    handle: JoinHandle<JobOutcome>,
}

impl JobAck {
    pub(crate) fn new(job_id: String, handle: JoinHandle<JobOutcome>) -> Self {
        Self { job_id, handle }
    }

    /// Whether the job has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job to finish
    pub async fn outcome(self) -> Result<JobOutcome, WorkerError> {
        self.handle
            .await
            .map_err(|e| WorkerError::Worker(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let completed = JobOutcome::AlreadyParsed {
            record_id: "rec-1".to_string(),
        };
        assert!(completed.is_success());
        assert_eq!(completed.record_id(), Some("rec-1"));

        let failed = JobOutcome::Failed {
            error: "Document not found: doc-1".to_string(),
            elapsed_ms: 3,
        };
        assert!(!failed.is_success());
        assert_eq!(failed.record_id(), None);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = JobOutcome::AlreadyParsed {
            record_id: "rec-1".to_string(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "already_parsed");
        assert_eq!(value["record_id"], "rec-1");
    }

    #[test]
    fn test_trigger_from_json() {
        let trigger: ExtractionTrigger = serde_json::from_str(
            r#"{"document_id": "doc-1", "job_id": "job-1", "organization_id": "org-1"}"#,
        )
        .unwrap();
        assert_eq!(trigger, ExtractionTrigger::new("doc-1", "job-1", "org-1"));
    }
}
