//! Comply Coverage
//!
//! Scores extracted SOC 2 controls against a regulatory mapping table.
//!
//! The coverage layer provides:
//! - The built-in DORA article table and TOML-loadable alternatives
//! - TSC category normalization and keyword inference
//! - Effectiveness-aware per-article coverage levels and confidences
//! - A weighted overall score and a gap report
//!
//! # Examples
//!
//! ```
//! use comply_coverage::{gap_report, CoverageScorer};
//! use comply_domain::{ExtractedControl, TestResult};
//!
//! let scorer = CoverageScorer::dora();
//! let controls = vec![ExtractedControl {
//!     control_id: "CC9.1".to_string(),
//!     category_code: "CC9".to_string(),
//!     description: "Vendor risk is assessed annually".to_string(),
//!     test_result: TestResult::Effective,
//!     page_ref: Some(88),
//!     confidence: 0.9,
//! }];
//!
//! let result = scorer.score(&controls);
//! assert!(result.articles_covered > 0);
//!
//! let gaps = gap_report(&result, scorer.table());
//! assert!(gaps.len() < result.articles_total);
//! ```

#![warn(missing_docs)]

pub mod categories;
mod config;
mod error;
mod gaps;
mod mapping;
mod scorer;

pub use categories::{infer_category, normalize_category, resolve_category, UNCATEGORIZED};
pub use config::ScoringConfig;
pub use error::CoverageError;
pub use gaps::{gap_report, CoverageGap};
pub use mapping::{ArticleMapping, MappingTable};
pub use scorer::{CoverageAssessment, CoverageLevel, CoverageResult, CoverageScorer};
