//! Job and document types exchanged with the storage boundary

use crate::{ExtractionStrategy, TokenUsage};
use serde::{Deserialize, Serialize};

/// A generic row for bulk upserts
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Document metadata as held by storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Document id
    pub id: String,
    /// Original filename
    pub filename: String,
    /// Path of the bytes in object storage
    pub storage_path: String,
    /// MIME type
    pub mime_type: String,
    /// Vendor the document belongs to, if any
    pub vendor_id: Option<String>,
    /// Owning organization
    pub organization_id: String,
}

/// A previously stored record for a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingRecord {
    /// Stored record id
    pub id: String,
    /// When it was stored (RFC 3339)
    pub created_at: String,
}

/// Marker written to a document after a successful parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// Id of the stored record
    pub parsed_id: String,
    /// Parser version that produced it
    pub parser_version: String,
    /// Wall-clock time of the parse
    pub processing_time_ms: u64,
}

/// Status of an extraction job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not yet started
    Pending,
    /// Reading and sizing the document
    Analyzing,
    /// Model calls in flight
    Extracting,
    /// Merging and checking results
    Verifying,
    /// Scoring and persisting
    Mapping,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Extracting => "extracting",
            JobStatus::Verifying => "verifying",
            JobStatus::Mapping => "mapping",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a status from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(JobStatus::Pending),
            "analyzing" => Some(JobStatus::Analyzing),
            "extracting" => Some(JobStatus::Extracting),
            "verifying" => Some(JobStatus::Verifying),
            "mapping" => Some(JobStatus::Mapping),
            "complete" => Some(JobStatus::Complete),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the job has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// A progress update for a job
///
/// Only the fields that are `Some` are written; the rest keep their stored
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// New status
    pub status: JobStatus,
    /// Progress in [0, 100]
    pub percentage: u8,
    /// Short phase label
    pub phase: Option<String>,
    /// Human-readable message
    pub message: Option<String>,
    /// Controls the report is expected to contain
    pub expected_controls: Option<usize>,
    /// Controls extracted so far
    pub extracted_controls: Option<usize>,
    /// Model calls made
    pub api_calls_count: Option<usize>,
    /// Strategy chosen
    pub extraction_strategy: Option<ExtractionStrategy>,
}

impl ProgressUpdate {
    /// Create an update with status, percentage, phase and message
    pub fn new(
        status: JobStatus,
        percentage: u8,
        phase: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            percentage: percentage.min(100),
            phase: Some(phase.into()),
            message: Some(message.into()),
            expected_controls: None,
            extracted_controls: None,
            api_calls_count: None,
            extraction_strategy: None,
        }
    }

    /// Attach extraction statistics
    pub fn with_stats(
        mut self,
        extracted_controls: usize,
        api_calls_count: usize,
        extraction_strategy: ExtractionStrategy,
    ) -> Self {
        self.extracted_controls = Some(extracted_controls);
        self.api_calls_count = Some(api_calls_count);
        self.extraction_strategy = Some(extraction_strategy);
        self
    }
}

/// Final statistics recorded on a completed job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    /// Number of controls extracted
    pub extracted_controls: usize,
    /// Token usage across all model calls
    pub token_usage: TokenUsage,
}

/// Where a piece of evidence was found in a source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLocation {
    /// Kind of evidence (`control` for extracted controls)
    pub evidence_type: String,
    /// Identifier of the evidence within the document
    pub evidence_id: String,
    /// Page number, if known
    pub page_number: Option<u32>,
    /// Section reference (the TSC category for controls)
    pub section_reference: String,
    /// Extracted text, bounded in length by the caller
    pub extracted_text: String,
    /// Extraction confidence
    pub confidence: f64,
    /// How the evidence was obtained
    pub extraction_method: String,
}

/// A control belonging to a regulatory framework in storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkControl {
    /// Storage id
    pub id: String,
    /// Framework-level control id (e.g. `Article 5`)
    pub control_id: String,
}
