//! Vendor control assessments derived from a coverage result
//!
//! Each framework control whose id matches a covered article becomes one
//! row keyed on vendor, control, organization and validity date. Articles
//! without a representative control have nothing to cite and are skipped.

use chrono::NaiveDate;
use comply_coverage::{CoverageLevel, CoverageResult};
use comply_domain::{FrameworkControl, Row};
use serde_json::Value;
use std::collections::HashMap;

/// Table vendor assessments are upserted into
pub const ASSESSMENT_TABLE: &str = "vendor_control_assessments";

/// Columns identifying an assessment
pub const ASSESSMENT_CONFLICT_KEYS: [&str; 4] =
    ["vendor_id", "control_id", "organization_id", "valid_from"];

/// Who and what an assessment is about
#[derive(Debug, Clone, Copy)]
pub struct AssessmentContext<'a> {
    /// Vendor the document belongs to
    pub vendor_id: &'a str,
    /// Owning organization
    pub organization_id: &'a str,
    /// Document cited as evidence
    pub document_id: &'a str,
    /// First day the assessment applies
    pub valid_from: NaiveDate,
}

/// Assessment status for a coverage level
pub fn assessment_status(level: CoverageLevel) -> &'static str {
    match level {
        CoverageLevel::Full => "met",
        CoverageLevel::Partial => "partially_met",
        CoverageLevel::None => "not_met",
    }
}

/// Build assessment rows, in framework-control order
pub fn assessment_rows(
    coverage: &CoverageResult,
    framework_controls: &[FrameworkControl],
    context: &AssessmentContext<'_>,
) -> Vec<Row> {
    let by_article: HashMap<&str, &str> = framework_controls
        .iter()
        .map(|c| (c.control_id.as_str(), c.id.as_str()))
        .collect();

    coverage
        .per_article
        .iter()
        .filter_map(|assessment| {
            let control_id = by_article.get(assessment.article_id.as_str())?;
            let evidence = assessment.representative_control_id.as_deref()?;

            let mut row = Row::new();
            row.insert("vendor_id".into(), Value::from(context.vendor_id));
            row.insert("control_id".into(), Value::from(*control_id));
            row.insert("organization_id".into(), Value::from(context.organization_id));
            row.insert("status".into(), Value::from(assessment_status(assessment.level)));
            row.insert("evidence_document_id".into(), Value::from(context.document_id));
            row.insert(
                "evidence_notes".into(),
                Value::from(format!(
                    "SOC 2 control {} provides {} coverage",
                    evidence,
                    assessment.level.as_str()
                )),
            );
            row.insert("confidence".into(), Value::from(assessment.confidence));
            row.insert("assessment_source".into(), Value::from("ai_parsed"));
            row.insert(
                "valid_from".into(),
                Value::from(context.valid_from.format("%Y-%m-%d").to_string()),
            );
            row.insert("is_current".into(), Value::from(true));
            Some(row)
        })
        .collect()
}
