//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{
    DocumentAnalysis, DocumentInfo, EvidenceLocation, ExistingRecord, FrameworkControl, JobStats,
    PersistedRecord, ProgressUpdate, Row,
};

/// Trait for reading documents and recording extraction outcomes
///
/// Implemented by the infrastructure layer (comply-store). Every failure is
/// terminal for the calling step; callers that treat a lookup as best-effort
/// convert the error to `None` themselves.
pub trait ComplianceStore {
    /// Error type for store operations
    type Error;

    /// Get document metadata by id
    fn get_document(&self, document_id: &str) -> Result<Option<DocumentInfo>, Self::Error>;

    /// Read the bytes stored at a path
    fn download(&self, storage_path: &str) -> Result<Vec<u8>, Self::Error>;

    /// Find a record already stored for a document
    fn check_existing(&self, document_id: &str) -> Result<Option<ExistingRecord>, Self::Error>;

    /// Store a parsed record and return its id
    fn insert_record(
        &mut self,
        document_id: &str,
        record: &PersistedRecord,
    ) -> Result<String, Self::Error>;

    /// Mark a document as parsed
    fn record_document_analysis(
        &mut self,
        document_id: &str,
        analysis: &DocumentAnalysis,
    ) -> Result<(), Self::Error>;

    /// Write a progress update for a job
    fn update_progress(&mut self, job_id: &str, update: &ProgressUpdate)
        -> Result<(), Self::Error>;

    /// Mark a job complete
    fn complete_job(
        &mut self,
        job_id: &str,
        result_id: &str,
        stats: &JobStats,
    ) -> Result<(), Self::Error>;

    /// Mark a job failed
    fn fail_job(&mut self, job_id: &str, error: &str) -> Result<(), Self::Error>;

    /// Record where evidence was found in a document
    fn insert_evidence_locations(
        &mut self,
        organization_id: &str,
        document_id: &str,
        locations: &[EvidenceLocation],
    ) -> Result<(), Self::Error>;

    /// Look up a framework id by its code
    fn framework_id(&self, code: &str) -> Result<Option<String>, Self::Error>;

    /// List the controls of a framework
    fn framework_controls(&self, framework_id: &str) -> Result<Vec<FrameworkControl>, Self::Error>;

    /// Insert or update rows, matching existing rows on the conflict keys
    ///
    /// Returns the number of rows written.
    fn upsert_rows(
        &mut self,
        table: &str,
        rows: &[Row],
        conflict_keys: &[&str],
    ) -> Result<usize, Self::Error>;
}
