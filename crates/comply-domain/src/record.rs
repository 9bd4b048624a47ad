//! Extraction record - the aggregate produced by one document parse

use crate::{Cuec, ExceptionRecord, ExtractedControl, ReportMetadata, SubserviceOrg, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a stored record, based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u128);

impl RecordId {
    /// Generate a new UUIDv7-based RecordId
    ///
    /// # Examples
    ///
    /// ```
    /// use comply_domain::RecordId;
    ///
    /// let id = RecordId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Parse a RecordId from its string form
    ///
    /// # Examples
    ///
    /// ```
    /// use comply_domain::RecordId;
    ///
    /// let id = RecordId::new();
    /// let parsed = RecordId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid record id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Everything extracted from one SOC 2 report
///
/// Built in full by the merge step and never mutated afterwards. Control
/// order is extraction order; it carries no meaning for identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Report-level metadata (always present)
    pub metadata: ReportMetadata,

    /// Controls in extraction order
    pub controls: Vec<ExtractedControl>,

    /// Exceptions noted by the auditor
    pub exceptions: Vec<ExceptionRecord>,

    /// Subservice organizations
    pub subservice_orgs: Vec<SubserviceOrg>,

    /// Complementary user entity controls
    pub cuecs: Vec<Cuec>,
}

impl ExtractionRecord {
    /// Create a record from its parts
    pub fn new(
        metadata: ReportMetadata,
        controls: Vec<ExtractedControl>,
        exceptions: Vec<ExceptionRecord>,
        subservice_orgs: Vec<SubserviceOrg>,
        cuecs: Vec<Cuec>,
    ) -> Self {
        Self {
            metadata,
            controls,
            exceptions,
            subservice_orgs,
            cuecs,
        }
    }

    /// Number of extracted controls (duplicates counted per occurrence)
    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    /// Resolve a soft control reference to the first matching control
    ///
    /// Matching ignores ASCII case and surrounding whitespace. Dangling
    /// references return `None`.
    pub fn control(&self, control_id: &str) -> Option<&ExtractedControl> {
        let wanted = control_id.trim();
        self.controls
            .iter()
            .find(|c| c.control_id.trim().eq_ignore_ascii_case(wanted))
    }

    /// Exceptions that reference the given control id
    pub fn exceptions_for(&self, control_id: &str) -> Vec<&ExceptionRecord> {
        let wanted = control_id.trim();
        self.exceptions
            .iter()
            .filter(|e| e.control_id.trim().eq_ignore_ascii_case(wanted))
            .collect()
    }

    /// The control a CUEC points at, if the reference resolves
    pub fn related_control(&self, cuec: &Cuec) -> Option<&ExtractedControl> {
        cuec.related_control.as_deref().and_then(|id| self.control(id))
    }

    /// Control counts per category code
    pub fn controls_by_category(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for control in &self.controls {
            *counts.entry(control.category_code.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Count of controls with the given test result
    pub fn count_by_result(&self, result: TestResult) -> usize {
        self.controls.iter().filter(|c| c.test_result == result).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(id: &str, category: &str, result: TestResult) -> ExtractedControl {
        ExtractedControl {
            control_id: id.to_string(),
            category_code: category.to_string(),
            description: "Test control".to_string(),
            test_result: result,
            page_ref: Some(12),
            confidence: 0.9,
        }
    }

    fn sample_record() -> ExtractionRecord {
        ExtractionRecord::new(
            ReportMetadata::default(),
            vec![
                control("CC6.1", "CC6", TestResult::Effective),
                control("CC7.2", "CC7", TestResult::Exception),
                control("CC6.1", "CC6", TestResult::Effective),
            ],
            vec![ExceptionRecord {
                control_id: "cc7.2".to_string(),
                control_area: None,
                description: "Alert not triaged within SLA".to_string(),
                management_response: None,
                page_ref: None,
            }],
            Vec::new(),
            vec![Cuec {
                id: Some("CUEC-1".to_string()),
                description: "Customers manage their own user access".to_string(),
                customer_responsibility: "Review access quarterly".to_string(),
                related_control: Some("CC9.9".to_string()),
                page_ref: None,
            }],
        )
    }

    #[test]
    fn test_duplicate_control_ids_are_kept() {
        let record = sample_record();
        assert_eq!(record.control_count(), 3);
        assert_eq!(record.controls_by_category().get("CC6"), Some(&2));
    }

    #[test]
    fn test_soft_reference_resolution() {
        let record = sample_record();
        assert!(record.control(" cc6.1 ").is_some());
        assert_eq!(record.exceptions_for("CC7.2").len(), 1);
        assert!(record.exceptions_for("CC1.1").is_empty());
    }

    #[test]
    fn test_dangling_cuec_reference_is_none() {
        let record = sample_record();
        assert!(record.related_control(&record.cuecs[0]).is_none());
    }

    #[test]
    fn test_count_by_result() {
        let record = sample_record();
        assert_eq!(record.count_by_result(TestResult::Effective), 2);
        assert_eq!(record.count_by_result(TestResult::Exception), 1);
        assert_eq!(record.count_by_result(TestResult::NotTested), 0);
    }

    #[test]
    fn test_record_id_display_round_trip() {
        let id = RecordId::new();
        assert_eq!(RecordId::from_string(&id.to_string()).unwrap(), id);
        assert!(RecordId::from_string("not-a-uuid").is_err());
    }
}
