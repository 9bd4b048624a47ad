//! Extracted controls and their test results

use serde::{Deserialize, Serialize};

/// Outcome of the auditor's test of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestResult {
    /// Operating effectively, no exceptions noted
    #[serde(rename = "operating_effectively")]
    Effective,

    /// Exception or deviation noted
    #[serde(rename = "exception")]
    Exception,

    /// Not tested or not applicable
    #[serde(rename = "not_tested")]
    NotTested,
}

impl TestResult {
    /// Get the canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TestResult::Effective => "operating_effectively",
            TestResult::Exception => "exception",
            TestResult::NotTested => "not_tested",
        }
    }

    /// Parse a canonical wire name (exact, case-insensitive)
    ///
    /// Fuzzy normalization of model output lives in the extractor; this only
    /// accepts the names produced by [`TestResult::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "operating_effectively" => Some(TestResult::Effective),
            "exception" => Some(TestResult::Exception),
            "not_tested" => Some(TestResult::NotTested),
            _ => None,
        }
    }
}

/// A single control extracted from a SOC 2 report
///
/// `control_id` is not unique within a document: a report that repeats a
/// control across sections yields several entries with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedControl {
    /// Control identifier as printed in the report (e.g. `CC6.1`, `SEC-01`)
    pub control_id: String,

    /// Normalized TSC category code (e.g. `CC6`, `A`, `PI`)
    pub category_code: String,

    /// Full control description
    pub description: String,

    /// Auditor's test result
    pub test_result: TestResult,

    /// Page where the control appears, if the model reported one
    pub page_ref: Option<u32>,

    /// Extraction confidence in [0.0, 1.0]
    pub confidence: f64,
}

impl ExtractedControl {
    /// Whether this control was tested without exceptions
    pub fn is_effective(&self) -> bool {
        self.test_result == TestResult::Effective
    }

    /// Whether the auditor noted an exception
    pub fn has_exception(&self) -> bool {
        self.test_result == TestResult::Exception
    }
}
