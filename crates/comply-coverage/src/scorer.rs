//! Coverage scoring of extracted controls against a mapping table

use crate::{ArticleMapping, MappingTable, ScoringConfig};
use comply_domain::{ExtractedControl, TestResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// How well an article is covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    /// Fully covered
    Full,
    /// Partially covered
    Partial,
    /// Not covered
    None,
}

impl CoverageLevel {
    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageLevel::Full => "full",
            CoverageLevel::Partial => "partial",
            CoverageLevel::None => "none",
        }
    }

    /// Whether the article counts as covered
    pub fn is_covered(&self) -> bool {
        !matches!(self, CoverageLevel::None)
    }
}

/// Assessment of a single article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAssessment {
    /// Article identifier
    pub article_id: String,

    /// Article title
    pub title: String,

    /// Coverage level
    pub level: CoverageLevel,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// A control that evidences the article, if any matched
    pub representative_control_id: Option<String>,

    /// Article weight
    pub weight: f64,

    /// Controls whose category the article requires
    pub matched_controls: usize,

    /// Matched controls with exceptions
    pub exception_count: usize,

    /// Effectiveness-weighted control count divided by required categories
    pub ratio: f64,
}

/// Coverage of a whole mapping table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Framework code of the mapping table
    pub framework: String,

    /// Weighted score in [0, 1], rounded to 3 decimals
    pub overall_score: f64,

    /// Articles at `full` or `partial`
    pub articles_covered: usize,

    /// Articles in the table
    pub articles_total: usize,

    /// One assessment per article, in table order
    pub per_article: Vec<CoverageAssessment>,
}

impl CoverageResult {
    /// Look up the assessment of an article
    pub fn article(&self, article_id: &str) -> Option<&CoverageAssessment> {
        self.per_article.iter().find(|a| a.article_id == article_id)
    }
}

/// Scores extracted controls against a shared mapping table
///
/// # Examples
///
/// ```
/// use comply_coverage::{CoverageLevel, CoverageScorer};
///
/// let scorer = CoverageScorer::dora();
/// let result = scorer.score(&[]);
/// assert_eq!(result.articles_total, 18);
/// assert_eq!(result.articles_covered, 0);
/// assert!(result.per_article.iter().all(|a| a.level == CoverageLevel::None));
/// ```
#[derive(Debug, Clone)]
pub struct CoverageScorer {
    table: Arc<MappingTable>,
    config: ScoringConfig,
}

impl CoverageScorer {
    /// Create a scorer over a table
    pub fn new(table: Arc<MappingTable>, config: ScoringConfig) -> Self {
        Self { table, config }
    }

    /// Scorer over the built-in DORA table with default configuration
    pub fn dora() -> Self {
        Self::new(Arc::new(MappingTable::dora()), ScoringConfig::default())
    }

    /// The mapping table
    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// The scoring configuration
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a control list against every article in the table
    ///
    /// The result has one assessment per article even when `controls` is
    /// empty, and does not depend on the order of `controls`.
    pub fn score(&self, controls: &[ExtractedControl]) -> CoverageResult {
        let per_article: Vec<CoverageAssessment> = self
            .table
            .articles
            .iter()
            .map(|article| self.assess_article(article, controls))
            .collect();

        let total_weight: f64 = per_article.iter().map(|a| a.weight).sum();
        let weighted: f64 = per_article
            .iter()
            .map(|a| self.level_score(a.level) * a.weight * a.confidence)
            .sum();

        let overall = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        };

        let articles_covered = per_article.iter().filter(|a| a.level.is_covered()).count();

        debug!(
            "Scored {} controls: {}/{} articles covered, overall {:.3}",
            controls.len(),
            articles_covered,
            per_article.len(),
            overall
        );

        CoverageResult {
            framework: self.table.framework.clone(),
            overall_score: round3(overall),
            articles_covered,
            articles_total: self.table.len(),
            per_article,
        }
    }

    /// Assess a single article
    pub fn assess_article(
        &self,
        article: &ArticleMapping,
        controls: &[ExtractedControl],
    ) -> CoverageAssessment {
        let matched: Vec<&ExtractedControl> = controls
            .iter()
            .filter(|c| article.requires(&c.category_code))
            .collect();

        let count = |result: TestResult| matched.iter().filter(|c| c.test_result == result).count();
        let effective = count(TestResult::Effective);
        let exceptions = count(TestResult::Exception);
        let not_tested = count(TestResult::NotTested);

        // Counts, not a running sum, so the score is independent of order
        let effective_score = effective as f64 * self.config.effective_weight
            + exceptions as f64 * self.config.exception_weight
            + not_tested as f64 * self.config.not_tested_weight;
        let ratio = effective_score / article.categories.len().max(1) as f64;

        let (level, confidence) = self.classify(matched.len(), exceptions, ratio);

        CoverageAssessment {
            article_id: article.article_id.clone(),
            title: article.title.clone(),
            level,
            confidence,
            representative_control_id: representative(&matched),
            weight: article.weight,
            matched_controls: matched.len(),
            exception_count: exceptions,
            ratio,
        }
    }

    fn classify(&self, matched: usize, exceptions: usize, ratio: f64) -> (CoverageLevel, f64) {
        let c = &self.config;

        if matched == 0 {
            (CoverageLevel::None, 0.0)
        } else if ratio >= c.strong_full_ratio && exceptions == 0 {
            (CoverageLevel::Full, c.strong_full_confidence)
        } else if ratio >= c.full_ratio && exceptions == 0 {
            (CoverageLevel::Full, c.full_confidence)
        } else if ratio >= c.partial_ratio {
            let penalty = (exceptions as f64 / matched as f64) * c.exception_penalty;
            (CoverageLevel::Partial, c.partial_confidence - penalty)
        } else if ratio >= c.weak_partial_ratio {
            (CoverageLevel::Partial, c.weak_partial_confidence)
        } else {
            (CoverageLevel::None, c.weak_none_confidence)
        }
    }

    fn level_score(&self, level: CoverageLevel) -> f64 {
        match level {
            CoverageLevel::Full => self.config.full_score,
            CoverageLevel::Partial => self.config.partial_score,
            CoverageLevel::None => 0.0,
        }
    }
}

/// Smallest id among effective controls, else smallest id overall
fn representative(matched: &[&ExtractedControl]) -> Option<String> {
    matched
        .iter()
        .filter(|c| c.is_effective())
        .map(|c| c.control_id.as_str())
        .min()
        .or_else(|| matched.iter().map(|c| c.control_id.as_str()).min())
        .map(str::to_string)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
