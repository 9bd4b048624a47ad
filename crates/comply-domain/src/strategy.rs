//! Extraction strategy - the shape of model-call invocation for a document

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a document is split into model calls
///
/// - SinglePass: one call returns everything
/// - TwoPass: metadata call, then controls call, sharing one upload
/// - Parallel: metadata call plus two control-partition calls, concurrently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// One model call
    SinglePass,

    /// Two sequential model calls against a shared upload
    TwoPass,

    /// Three concurrent model calls against a shared upload
    Parallel,
}

impl ExtractionStrategy {
    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::SinglePass => "single_pass",
            ExtractionStrategy::TwoPass => "two_pass",
            ExtractionStrategy::Parallel => "parallel",
        }
    }

    /// Parse a strategy from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single_pass" => Some(ExtractionStrategy::SinglePass),
            "two_pass" => Some(ExtractionStrategy::TwoPass),
            "parallel" => Some(ExtractionStrategy::Parallel),
            _ => None,
        }
    }

    /// Number of model calls this strategy issues
    pub fn expected_calls(&self) -> usize {
        match self {
            ExtractionStrategy::SinglePass => 1,
            ExtractionStrategy::TwoPass => 2,
            ExtractionStrategy::Parallel => 3,
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in [
            ExtractionStrategy::SinglePass,
            ExtractionStrategy::TwoPass,
            ExtractionStrategy::Parallel,
        ] {
            assert_eq!(ExtractionStrategy::parse(strategy.as_str()), Some(strategy));
        }
        assert_eq!(ExtractionStrategy::parse("chunked"), None);
    }

    #[test]
    fn test_expected_calls() {
        assert_eq!(ExtractionStrategy::SinglePass.expected_calls(), 1);
        assert_eq!(ExtractionStrategy::TwoPass.expected_calls(), 2);
        assert_eq!(ExtractionStrategy::Parallel.expected_calls(), 3);
    }
}
