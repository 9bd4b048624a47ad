//! Report metadata and the auxiliary entities extracted alongside controls

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// SOC 2 report type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// Design of controls at a point in time
    Type1,
    /// Design and operating effectiveness over a period
    Type2,
}

impl ReportType {
    /// Get the report type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Type1 => "type1",
            ReportType::Type2 => "type2",
        }
    }
}

/// Auditor's opinion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpinionType {
    /// Clean opinion
    Unqualified,
    /// Opinion with reservations
    Qualified,
    /// Controls not suitably designed or not operating
    Adverse,
}

impl OpinionType {
    /// Get the opinion name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            OpinionType::Unqualified => "unqualified",
            OpinionType::Qualified => "qualified",
            OpinionType::Adverse => "adverse",
        }
    }
}

/// Trust Services Criteria covered by a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustServicesCriteria {
    /// Common criteria (always in scope)
    Security,
    /// Availability
    Availability,
    /// Processing integrity
    ProcessingIntegrity,
    /// Confidentiality
    Confidentiality,
    /// Privacy
    Privacy,
}

impl TrustServicesCriteria {
    /// Get the criteria name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustServicesCriteria::Security => "security",
            TrustServicesCriteria::Availability => "availability",
            TrustServicesCriteria::ProcessingIntegrity => "processing_integrity",
            TrustServicesCriteria::Confidentiality => "confidentiality",
            TrustServicesCriteria::Privacy => "privacy",
        }
    }

    /// Parse a criteria name, tolerating spaces, hyphens and case
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "security" => Some(TrustServicesCriteria::Security),
            "availability" => Some(TrustServicesCriteria::Availability),
            "processing_integrity" => Some(TrustServicesCriteria::ProcessingIntegrity),
            "confidentiality" => Some(TrustServicesCriteria::Confidentiality),
            "privacy" => Some(TrustServicesCriteria::Privacy),
            _ => None,
        }
    }
}

/// Report-level metadata
///
/// Exactly one per extraction record. Fields the model could not extract
/// carry defaults rather than being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Type 1 or Type 2
    pub report_type: ReportType,

    /// CPA firm that performed the audit
    pub audit_firm: String,

    /// Auditor's opinion
    pub opinion: OpinionType,

    /// Start of the audit period, if a date could be parsed
    pub period_start: Option<NaiveDate>,

    /// End of the audit period, if a date could be parsed
    pub period_end: Option<NaiveDate>,

    /// Name of the audited service organization
    pub service_org_name: String,

    /// Criteria covered by the report
    pub trust_services_criteria: Vec<TrustServicesCriteria>,

    /// Brief description of the system in scope
    pub system_description: Option<String>,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            report_type: ReportType::Type1,
            audit_firm: "Unknown".to_string(),
            opinion: OpinionType::Qualified,
            period_start: None,
            period_end: None,
            service_org_name: "Unknown".to_string(),
            trust_services_criteria: Vec::new(),
            system_description: None,
        }
    }
}

/// An exception (deviation) noted by the auditor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// Soft reference to the control with the exception
    pub control_id: String,

    /// Control area or category, if given
    pub control_area: Option<String>,

    /// Description of the deviation
    pub description: String,

    /// Management's response, if given
    pub management_response: Option<String>,

    /// Page reference
    pub page_ref: Option<u32>,
}

/// A subservice organization referenced by the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubserviceOrg {
    /// Organization name
    pub name: String,

    /// Services provided to the audited entity
    pub service_description: String,

    /// Whether the organization is carved out of scope
    pub carve_out: bool,

    /// Page reference
    pub page_ref: Option<u32>,
}

/// Complementary User Entity Control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cuec {
    /// Identifier, if the report numbers its CUECs
    pub id: Option<String>,

    /// Control description
    pub description: String,

    /// What the customer is expected to do
    pub customer_responsibility: String,

    /// Soft reference to a related SOC 2 control
    pub related_control: Option<String>,

    /// Page reference
    pub page_ref: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_parse_variants() {
        assert_eq!(
            TrustServicesCriteria::parse("Processing Integrity"),
            Some(TrustServicesCriteria::ProcessingIntegrity)
        );
        assert_eq!(
            TrustServicesCriteria::parse("processing-integrity"),
            Some(TrustServicesCriteria::ProcessingIntegrity)
        );
        assert_eq!(TrustServicesCriteria::parse(" SECURITY "), Some(TrustServicesCriteria::Security));
        assert_eq!(TrustServicesCriteria::parse("integrity"), None);
    }

    #[test]
    fn test_default_metadata_is_conservative() {
        let metadata = ReportMetadata::default();
        assert_eq!(metadata.report_type, ReportType::Type1);
        assert_eq!(metadata.opinion, OpinionType::Qualified);
        assert!(metadata.period_start.is_none());
    }
}
