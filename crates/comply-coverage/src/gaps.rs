//! Gap report for articles that are not fully covered

use crate::{CoverageLevel, CoverageResult, MappingTable};
use serde::{Deserialize, Serialize};

/// An article at `none` or `partial` coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    /// Article identifier
    pub article_id: String,
    /// Article title
    pub title: String,
    /// What the article requires
    pub description: String,
    /// Current coverage level
    pub level: CoverageLevel,
    /// Article weight
    pub weight: f64,
    /// Category codes that would close the gap
    pub required_categories: Vec<String>,
    /// Remediation hint
    pub remediation: String,
}

/// List gaps, heaviest articles first
///
/// Articles of equal weight keep table order.
pub fn gap_report(result: &CoverageResult, table: &MappingTable) -> Vec<CoverageGap> {
    let mut gaps: Vec<CoverageGap> = result
        .per_article
        .iter()
        .filter(|a| a.level != CoverageLevel::Full)
        .filter_map(|assessment| {
            let article = table.get(&assessment.article_id)?;
            Some(CoverageGap {
                article_id: article.article_id.clone(),
                title: article.title.clone(),
                description: article.description.clone(),
                level: assessment.level,
                weight: article.weight,
                required_categories: article.categories.clone(),
                remediation: article.remediation(),
            })
        })
        .collect();

    gaps.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    gaps
}
