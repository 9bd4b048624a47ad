//! Scoring configuration

use crate::CoverageError;
use serde::{Deserialize, Serialize};

/// Weights, thresholds and confidences used by the coverage scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Contribution of a control that operated effectively
    pub effective_weight: f64,

    /// Contribution of a control with an exception
    pub exception_weight: f64,

    /// Contribution of a control that was not tested
    pub not_tested_weight: f64,

    /// Ratio at or above which an exception-free article is strongly full
    pub strong_full_ratio: f64,

    /// Confidence of a strongly full article
    pub strong_full_confidence: f64,

    /// Ratio at or above which an exception-free article is full
    pub full_ratio: f64,

    /// Confidence of a full article
    pub full_confidence: f64,

    /// Ratio at or above which an article is partial with exception penalty
    pub partial_ratio: f64,

    /// Base confidence of a partial article
    pub partial_confidence: f64,

    /// Maximum penalty applied for exceptions (scaled by exception share)
    pub exception_penalty: f64,

    /// Ratio at or above which an article is weakly partial
    pub weak_partial_ratio: f64,

    /// Confidence of a weakly partial article
    pub weak_partial_confidence: f64,

    /// Confidence of an article with controls but too little coverage
    pub weak_none_confidence: f64,

    /// Score of a full article in the overall sum
    pub full_score: f64,

    /// Score of a partial article in the overall sum
    pub partial_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            effective_weight: 1.0,
            exception_weight: 0.3,
            not_tested_weight: 0.1,
            strong_full_ratio: 1.5,
            strong_full_confidence: 0.95,
            full_ratio: 1.0,
            full_confidence: 0.85,
            partial_ratio: 0.7,
            partial_confidence: 0.7,
            exception_penalty: 0.2,
            weak_partial_ratio: 0.3,
            weak_partial_confidence: 0.5,
            weak_none_confidence: 0.2,
            full_score: 1.0,
            partial_score: 0.5,
        }
    }
}

impl ScoringConfig {
    /// Parse from TOML; missing keys take default values
    pub fn from_toml(toml_str: &str) -> Result<Self, CoverageError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| CoverageError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, CoverageError> {
        toml::to_string_pretty(self).map_err(|e| CoverageError::Parse(e.to_string()))
    }

    /// Check that thresholds are ordered and values are in range
    pub fn validate(&self) -> Result<(), CoverageError> {
        let unit_values = [
            ("effective_weight", self.effective_weight),
            ("exception_weight", self.exception_weight),
            ("not_tested_weight", self.not_tested_weight),
            ("strong_full_confidence", self.strong_full_confidence),
            ("full_confidence", self.full_confidence),
            ("partial_confidence", self.partial_confidence),
            ("exception_penalty", self.exception_penalty),
            ("weak_partial_confidence", self.weak_partial_confidence),
            ("weak_none_confidence", self.weak_none_confidence),
            ("full_score", self.full_score),
            ("partial_score", self.partial_score),
        ];

        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoverageError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if self.exception_penalty > self.partial_confidence {
            return Err(CoverageError::Config(
                "exception_penalty must not exceed partial_confidence".to_string(),
            ));
        }

        if !(self.weak_partial_ratio < self.partial_ratio
            && self.partial_ratio <= self.full_ratio
            && self.full_ratio <= self.strong_full_ratio)
        {
            return Err(CoverageError::Config(
                "ratios must satisfy weak_partial < partial <= full <= strong_full".to_string(),
            ));
        }

        if self.weak_partial_ratio < 0.0 {
            return Err(CoverageError::Config(
                "weak_partial_ratio must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exception_weight, 0.3);
        assert_eq!(config.strong_full_confidence, 0.95);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ScoringConfig::from_toml("exception_weight = 0.2\n").unwrap();
        assert_eq!(config.exception_weight, 0.2);
        assert_eq!(config.effective_weight, 1.0);
    }

    #[test]
    fn test_rejects_unordered_ratios() {
        let config = ScoringConfig {
            partial_ratio: 1.2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoverageError::Config(_))));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let config = ScoringConfig {
            full_confidence: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ScoringConfig::default();
        let parsed = ScoringConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
