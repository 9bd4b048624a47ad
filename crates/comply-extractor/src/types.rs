//! Request and result types for a parse

use crate::estimate::SizeEstimate;
use comply_coverage::CoverageResult;
use comply_domain::{
    ConfidenceScores, ExtractionRecord, ExtractionStrategy, PersistedRecord, RawExtractionStats,
    TokenUsage,
};
use serde::{Deserialize, Serialize};

/// Identifies the document being parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseContext {
    /// Document id, carried into the result
    pub document_id: String,

    /// Job id, used for log correlation only
    pub job_id: Option<String>,
}

impl ParseContext {
    /// Create a context for a document
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            job_id: None,
        }
    }

    /// Attach a job id
    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

/// State of a parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseState {
    /// Not started
    Init,
    /// Estimating document size
    Estimating,
    /// Strategy chosen
    StrategySelected,
    /// Model calls in flight
    Extracting,
    /// Merging call results
    Merging,
    /// Scoring coverage
    Scoring,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
}

impl ParseState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseState::Init => "init",
            ParseState::Estimating => "estimating",
            ParseState::StrategySelected => "strategy_selected",
            ParseState::Extracting => "extracting",
            ParseState::Merging => "merging",
            ParseState::Scoring => "scoring",
            ParseState::Complete => "complete",
            ParseState::Failed => "failed",
        }
    }
}

/// Outcome of a parse
///
/// A failed parse still carries the document id, elapsed time, and whatever
/// was known before the failure (size estimate, strategy).
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Whether the parse completed
    pub success: bool,

    /// Document that was parsed
    pub document_id: String,

    /// Merged record, on success
    pub record: Option<ExtractionRecord>,

    /// Strategy used, once selected
    pub strategy: Option<ExtractionStrategy>,

    /// Model calls made
    pub calls_made: usize,

    /// Token usage across all calls
    pub usage: TokenUsage,

    /// Coverage score, on success
    pub coverage: Option<CoverageResult>,

    /// Error message, on failure
    pub error: Option<String>,

    /// Wall time of the parse (milliseconds)
    pub elapsed_ms: u64,

    /// Size estimate, once computed
    pub size: Option<SizeEstimate>,

    /// Final state (`Complete` or `Failed`)
    pub state: ParseState,

    /// State in which the parse failed
    pub failed_stage: Option<ParseState>,

    /// Parser version
    pub parser_version: String,

    /// Number of extracted controls
    pub extracted_controls: usize,

    /// Confidence summary, on success
    pub confidence_scores: Option<ConfidenceScores>,
}

impl ParseResult {
    /// Extraction statistics for persistence
    pub fn raw_stats(&self) -> Option<RawExtractionStats> {
        Some(RawExtractionStats {
            parser_version: self.parser_version.clone(),
            extraction_strategy: self.strategy?,
            api_calls_count: self.calls_made,
            processing_time_ms: self.elapsed_ms,
        })
    }

    /// The persisted shape of a successful parse
    pub fn to_persisted(&self) -> Option<PersistedRecord> {
        let record = self.record.as_ref()?;
        let scores = self
            .confidence_scores
            .unwrap_or_else(|| ConfidenceScores::for_record(record));

        Some(PersistedRecord::from_record(record, self.raw_stats()?, scores))
    }
}
