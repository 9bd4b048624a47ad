//! Persisted record shape
//!
//! The storage layer keeps one row per parsed document. Top-level columns are
//! snake_case; the nested arrays use camelCase keys so that downstream readers
//! of the JSON columns see the same field names the extraction prompts use.

use crate::{
    Cuec, ExceptionRecord, ExtractedControl, ExtractionRecord, ExtractionStrategy, OpinionType,
    ReportMetadata, ReportType, SubserviceOrg, TestResult, TrustServicesCriteria,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Confidence summary stored alongside a record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    /// Confidence in the report metadata
    pub metadata: f64,
    /// Mean confidence across extracted controls
    pub controls: f64,
    /// Confidence in the exception list
    pub exceptions: f64,
    /// Confidence in the CUEC list
    pub cuecs: f64,
    /// Overall confidence
    pub overall: f64,
}

impl Default for ConfidenceScores {
    fn default() -> Self {
        Self {
            metadata: 0.9,
            controls: 0.85,
            exceptions: 0.9,
            cuecs: 0.85,
            overall: 0.87,
        }
    }
}

impl ConfidenceScores {
    /// Derive a summary from a record
    ///
    /// The controls score is the mean control confidence (the default when
    /// there are no controls). The overall score is the mean of the four
    /// section scores.
    pub fn for_record(record: &ExtractionRecord) -> Self {
        let defaults = Self::default();
        let controls = if record.controls.is_empty() {
            defaults.controls
        } else {
            record.controls.iter().map(|c| c.confidence).sum::<f64>() / record.controls.len() as f64
        };

        let overall = (defaults.metadata + controls + defaults.exceptions + defaults.cuecs) / 4.0;

        Self {
            controls,
            overall,
            ..defaults
        }
    }
}

/// Extraction statistics stored with the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtractionStats {
    /// Version of the parser that produced the record
    pub parser_version: String,
    /// Strategy used
    pub extraction_strategy: ExtractionStrategy,
    /// Number of model calls made
    pub api_calls_count: usize,
    /// Wall-clock time of the parse
    pub processing_time_ms: u64,
}

/// Control row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedControl {
    /// Control identifier
    pub control_id: String,
    /// TSC category code
    pub tsc_category: String,
    /// Description
    pub description: String,
    /// Test result
    pub test_result: TestResult,
    /// Page reference
    pub page_ref: Option<u32>,
    /// Extraction confidence
    pub confidence: f64,
}

/// Exception row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedException {
    /// Control identifier
    pub control_id: String,
    /// Control area
    pub control_area: Option<String>,
    /// Deviation description
    pub exception_description: String,
    /// Management response
    pub management_response: Option<String>,
    /// Page reference
    pub page_ref: Option<u32>,
}

/// Subservice organization row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSubserviceOrg {
    /// Organization name
    pub name: String,
    /// Services provided
    pub service_description: String,
    /// Carved out of scope
    pub carve_out: bool,
    /// Page reference
    pub page_ref: Option<u32>,
}

/// CUEC row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCuec {
    /// Identifier
    pub id: Option<String>,
    /// Description
    pub description: String,
    /// Customer responsibility
    pub customer_responsibility: String,
    /// Related control
    pub related_control: Option<String>,
    /// Page reference
    pub page_ref: Option<u32>,
}

/// One parsed-document row, ready for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Report type
    pub report_type: ReportType,
    /// Audit firm
    pub audit_firm: String,
    /// Opinion
    pub opinion: OpinionType,
    /// Audit period start
    pub period_start: Option<NaiveDate>,
    /// Audit period end
    pub period_end: Option<NaiveDate>,
    /// Trust services criteria in scope
    pub criteria: Vec<TrustServicesCriteria>,
    /// System description
    pub system_description: Option<String>,
    /// Service organization name
    pub service_org_name: String,
    /// Controls
    pub controls: Vec<PersistedControl>,
    /// Exceptions
    pub exceptions: Vec<PersistedException>,
    /// Subservice organizations
    pub subservice_orgs: Vec<PersistedSubserviceOrg>,
    /// CUECs
    pub cuecs: Vec<PersistedCuec>,
    /// Extraction statistics
    pub raw_extraction: RawExtractionStats,
    /// Confidence summary
    pub confidence_scores: ConfidenceScores,
}

impl PersistedRecord {
    /// Build the stored shape from an extraction record
    pub fn from_record(
        record: &ExtractionRecord,
        raw_extraction: RawExtractionStats,
        confidence_scores: ConfidenceScores,
    ) -> Self {
        let metadata = &record.metadata;

        Self {
            report_type: metadata.report_type,
            audit_firm: metadata.audit_firm.clone(),
            opinion: metadata.opinion,
            period_start: metadata.period_start,
            period_end: metadata.period_end,
            criteria: metadata.trust_services_criteria.clone(),
            system_description: metadata.system_description.clone(),
            service_org_name: metadata.service_org_name.clone(),
            controls: record
                .controls
                .iter()
                .map(|c| PersistedControl {
                    control_id: c.control_id.clone(),
                    tsc_category: c.category_code.clone(),
                    description: c.description.clone(),
                    test_result: c.test_result,
                    page_ref: c.page_ref,
                    confidence: c.confidence,
                })
                .collect(),
            exceptions: record
                .exceptions
                .iter()
                .map(|e| PersistedException {
                    control_id: e.control_id.clone(),
                    control_area: e.control_area.clone(),
                    exception_description: e.description.clone(),
                    management_response: e.management_response.clone(),
                    page_ref: e.page_ref,
                })
                .collect(),
            subservice_orgs: record
                .subservice_orgs
                .iter()
                .map(|s| PersistedSubserviceOrg {
                    name: s.name.clone(),
                    service_description: s.service_description.clone(),
                    carve_out: s.carve_out,
                    page_ref: s.page_ref,
                })
                .collect(),
            cuecs: record
                .cuecs
                .iter()
                .map(|c| PersistedCuec {
                    id: c.id.clone(),
                    description: c.description.clone(),
                    customer_responsibility: c.customer_responsibility.clone(),
                    related_control: c.related_control.clone(),
                    page_ref: c.page_ref,
                })
                .collect(),
            raw_extraction,
            confidence_scores,
        }
    }

    /// Rebuild the extraction record from the stored shape
    pub fn to_record(&self) -> ExtractionRecord {
        let metadata = ReportMetadata {
            report_type: self.report_type,
            audit_firm: self.audit_firm.clone(),
            opinion: self.opinion,
            period_start: self.period_start,
            period_end: self.period_end,
            service_org_name: self.service_org_name.clone(),
            trust_services_criteria: self.criteria.clone(),
            system_description: self.system_description.clone(),
        };

        ExtractionRecord::new(
            metadata,
            self.controls
                .iter()
                .map(|c| ExtractedControl {
                    control_id: c.control_id.clone(),
                    category_code: c.tsc_category.clone(),
                    description: c.description.clone(),
                    test_result: c.test_result,
                    page_ref: c.page_ref,
                    confidence: c.confidence,
                })
                .collect(),
            self.exceptions
                .iter()
                .map(|e| ExceptionRecord {
                    control_id: e.control_id.clone(),
                    control_area: e.control_area.clone(),
                    description: e.exception_description.clone(),
                    management_response: e.management_response.clone(),
                    page_ref: e.page_ref,
                })
                .collect(),
            self.subservice_orgs
                .iter()
                .map(|s| SubserviceOrg {
                    name: s.name.clone(),
                    service_description: s.service_description.clone(),
                    carve_out: s.carve_out,
                    page_ref: s.page_ref,
                })
                .collect(),
            self.cuecs
                .iter()
                .map(|c| Cuec {
                    id: c.id.clone(),
                    description: c.description.clone(),
                    customer_responsibility: c.customer_responsibility.clone(),
                    related_control: c.related_control.clone(),
                    page_ref: c.page_ref,
                })
                .collect(),
        )
    }
}
