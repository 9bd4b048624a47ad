//! Comply Extractor
//!
//! Turns a SOC 2 report into a structured extraction record and a coverage
//! score.
//!
//! # Overview
//!
//! The hard part of report extraction is not the model call but the work
//! around it: choosing how many calls to make for a document of a given
//! size, running them with retries against one shared upload, merging the
//! partial JSON results into one record, and reporting progress.
//!
//! # Architecture
//!
//! ```text
//! bytes → estimate → strategy → 1-3 model calls → merge → record → coverage
//! ```
//!
//! | Estimated pages | Strategy | Calls |
//! |---|---|---|
//! | ≤ 80 | single pass | full |
//! | 81-150 | two pass (sequential) | metadata, controls |
//! | > 150 | parallel | metadata, CC1-CC5, CC6+ |
//!
//! # Example Usage
//!
//! ```
//! use comply_coverage::CoverageScorer;
//! use comply_extractor::{ExtractorConfig, Orchestrator, ParseContext, ProgressLog};
//! use comply_llm::MockBackend;
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new(r#"{
//!     "metadata": {"reportType": "type2", "auditFirm": "Example LLP"},
//!     "controls": [{"controlId": "CC9.1", "tscCategory": "CC9",
//!                   "description": "Vendor risk reviews", "testResult": "operating_effectively"}]
//! }"#);
//! let orchestrator =
//!     Orchestrator::new(backend, CoverageScorer::dora(), ExtractorConfig::default()).unwrap();
//!
//! let progress = ProgressLog::new();
//! let result = orchestrator
//!     .parse(b"%PDF-1.7", &ParseContext::new("doc-1"), &progress)
//!     .await;
//!
//! assert!(result.success);
//! assert_eq!(result.extracted_controls, 1);
//! assert_eq!(progress.percentages(), vec![5, 20, 80, 100]);
//! # });
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod estimate;
mod merge;
mod orchestrator;
pub mod parser;
mod progress;
pub mod prompt;
mod selector;
mod types;

#[cfg(test)]
mod tests;

pub use config::{ExtractorConfig, RetrySettings, PARSER_VERSION};
pub use error::ExtractorError;
pub use estimate::{estimate, SizeEstimate};
pub use merge::merge_results;
pub use orchestrator::Orchestrator;
pub use parser::ResultParser;
pub use progress::{NoProgress, ProgressEvent, ProgressLog, ProgressPhase, ProgressSink};
pub use selector::select_strategy;
pub use types::{ParseContext, ParseResult, ParseState};
