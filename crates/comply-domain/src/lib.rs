//! Comply Domain Layer
//!
//! This crate contains the data model shared by every other Comply crate:
//! the typed entities extracted from a SOC 2 report, the extraction strategy
//! tag, token accounting, the persisted record shape, and the trait boundary
//! to persistent storage.
//!
//! ## Key Concepts
//!
//! - **ExtractedControl**: one control row from the report, with its TSC
//!   category and test result
//! - **ExtractionRecord**: the aggregate built once per document parse and
//!   never mutated afterwards
//! - **ExtractionStrategy**: single pass, two pass, or parallel model calls
//! - **TokenUsage**: input/output/cached token counters summed across calls
//! - **PersistedRecord**: the nested, camelCase shape written to storage
//!
//! ## Architecture
//!
//! - Plain data and pure helpers only
//! - No I/O; storage is reached through [`traits::ComplianceStore`]
//! - Soft references (`control_id`, `related_control`) resolve to `Option`,
//!   never to an error

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod job;
pub mod persisted;
pub mod record;
pub mod report;
pub mod strategy;
pub mod traits;
pub mod usage;

// Re-exports for convenience
pub use control::{ExtractedControl, TestResult};
pub use job::{
    DocumentAnalysis, DocumentInfo, EvidenceLocation, ExistingRecord, FrameworkControl, JobStats,
    JobStatus, ProgressUpdate, Row,
};
pub use persisted::{
    ConfidenceScores, PersistedControl, PersistedCuec, PersistedException, PersistedRecord,
    PersistedSubserviceOrg, RawExtractionStats,
};
pub use record::{ExtractionRecord, RecordId};
pub use report::{
    Cuec, ExceptionRecord, OpinionType, ReportMetadata, ReportType, SubserviceOrg,
    TrustServicesCriteria,
};
pub use strategy::ExtractionStrategy;
pub use traits::ComplianceStore;
pub use usage::TokenUsage;
