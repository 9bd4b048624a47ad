//! Comply Worker
//!
//! Runs extraction jobs for the inbound trigger `{document_id, job_id,
//! organization_id}`.
//!
//! # Overview
//!
//! A job is acknowledged immediately and executed on its own task. The
//! runner is responsible for:
//! - **Idempotency**: a document that already has a record completes the job
//!   with the existing record id and no model calls
//! - **Progress**: orchestrator checkpoints are written to the job as
//!   `analyzing`, `extracting`, `verifying` and `mapping` statuses
//! - **Persistence**: the parsed record, the document's analysis marker, and
//!   one evidence location per control
//! - **Vendor assessments**: coverage levels upserted against the
//!   framework's controls when the document belongs to a vendor
//! - **Metrics**: jobs per outcome, model calls, tokens, strategies
//!
//! # Job Lifecycle
//!
//! | Step | Status | Progress |
//! |------|--------|----------|
//! | starting | analyzing | 5 |
//! | downloading | analyzing | 10 |
//! | parse checkpoints | analyzing / extracting / verifying / mapping | 15-100 |
//! | storing | mapping | 85 |
//! | done | complete | 100 |
//!
//! Any failure marks the job `failed` with the error message truncated to
//! `max_error_message_len` characters.
//!
//! # Usage
//!
//! ```no_run
//! use comply_coverage::CoverageScorer;
//! use comply_extractor::{ExtractorConfig, Orchestrator};
//! use comply_llm::MockBackend;
//! use comply_store::SqliteStore;
//! use comply_worker::{ExtractionTrigger, JobRunner, WorkerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::new("comply.db")?;
//!     let orchestrator = Orchestrator::new(
//!         MockBackend::default(),
//!         CoverageScorer::dora(),
//!         ExtractorConfig::default(),
//!     )?;
//!     let runner = JobRunner::new(store, orchestrator, WorkerConfig::default())?;
//!
//!     let ack = runner.enqueue(ExtractionTrigger::new("doc-1", "job-1", "org-1"));
//!     println!("accepted {}", ack.job_id);
//!
//!     let outcome = ack.outcome().await?;
//!     println!("{:?}", outcome);
//!     println!("{}", runner.metrics().summary());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! framework_code = "dora"
//! max_error_message_len = 500
//! record_evidence = true
//! evidence_text_limit = 2000
//! create_assessments = true
//! ```

#![warn(missing_docs)]

pub mod assessments;
mod config;
mod error;
pub mod evidence;
mod job;
mod metrics;
mod worker;


pub use config::WorkerConfig;
pub use error::WorkerError;
pub use job::{ExtractionTrigger, JobAck, JobOutcome};
pub use metrics::WorkerMetrics;
pub use worker::JobRunner;
