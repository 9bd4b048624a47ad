//! Parse model call results into typed entities
//!
//! Model output is loosely structured even under a response schema. Every
//! enum-like field is normalized with substring rules that fall back to the
//! most conservative value, and unparseable optional fields become `None`.
//! Only a missing required section is an error.

use crate::error::ExtractorError;
use chrono::NaiveDate;
use comply_coverage::resolve_category;
use comply_domain::{
    Cuec, ExceptionRecord, ExtractedControl, OpinionType, ReportMetadata, ReportType,
    SubserviceOrg, TestResult, TrustServicesCriteria,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Identifier used when a control row carries no id
pub const UNKNOWN_CONTROL_ID: &str = "UNKNOWN";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%B %d, %Y", "%b %d, %Y"];

/// Normalize a report type; anything unrecognized is Type 1
///
/// Only a type marker counts (`type 2`, `type2`, `type ii`, `type-ii`), so
/// years and the "SOC 2" name do not.
pub fn parse_report_type(raw: &str) -> ReportType {
    let lower = raw.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let is_type2 = tokens.iter().enumerate().any(|(i, token)| match *token {
        "type2" | "typeii" => true,
        "type" => matches!(tokens.get(i + 1), Some(&"2") | Some(&"ii")),
        _ => false,
    });

    if is_type2 {
        ReportType::Type2
    } else {
        ReportType::Type1
    }
}

/// Normalize an opinion; anything unrecognized is qualified
pub fn parse_opinion(raw: &str) -> OpinionType {
    let lower = raw.to_lowercase();
    if lower.contains("adverse") {
        OpinionType::Adverse
    } else if lower.contains("unqualified") || lower.contains("unmodified") || lower.contains("clean") {
        OpinionType::Unqualified
    } else {
        OpinionType::Qualified
    }
}

/// Normalize a test result; anything unrecognized is an exception
pub fn parse_test_result(raw: &str) -> TestResult {
    let lower = raw.to_lowercase().replace('_', " ");

    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["no exception", "without exception", "no deviation"]) {
        TestResult::Effective
    } else if has(&["exception", "deviation", "ineffective", "not operating", "failed"]) {
        TestResult::Exception
    } else if has(&["not tested", "untested", "not applicable", "n/a"]) {
        TestResult::NotTested
    } else if has(&["effective", "passed"]) {
        TestResult::Effective
    } else {
        TestResult::Exception
    }
}

/// Parse an audit-period date in any of the supported formats
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Normalize a criteria list, dropping unknown entries and duplicates
pub fn parse_criteria(raw: Option<&Value>) -> Vec<TrustServicesCriteria> {
    let mut criteria = Vec::new();
    for entry in raw.and_then(Value::as_array).into_iter().flatten() {
        match entry.as_str().and_then(TrustServicesCriteria::parse) {
            Some(c) if !criteria.contains(&c) => criteria.push(c),
            Some(_) => {}
            None => debug!("Dropping unknown criteria entry {}", entry),
        }
    }
    criteria
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn page_ref(obj: &Map<String, Value>) -> Option<u32> {
    match obj.get("pageRef")? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn objects<'a>(
    items: Option<&'a Value>,
    kind: &'a str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    items
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(move |(idx, item)| {
            let obj = item.as_object();
            if obj.is_none() {
                warn!("Skipping {} {}: not a JSON object", kind, idx);
            }
            obj
        })
}

/// Converts call results into typed entities
#[derive(Debug, Clone, Copy)]
pub struct ResultParser {
    default_confidence: f64,
}

impl ResultParser {
    /// Create a parser that gives unscored controls `default_confidence`
    pub fn new(default_confidence: f64) -> Self {
        Self {
            default_confidence: default_confidence.clamp(0.0, 1.0),
        }
    }

    /// Parse the required `metadata` section of a call result
    pub fn metadata(&self, result: &Value, call: &str) -> Result<ReportMetadata, ExtractorError> {
        let obj = result
            .get("metadata")
            .and_then(Value::as_object)
            .ok_or_else(|| missing(call, "metadata"))?;

        let defaults = ReportMetadata::default();

        Ok(ReportMetadata {
            report_type: text(obj, "reportType")
                .map(|s| parse_report_type(&s))
                .unwrap_or(defaults.report_type),
            audit_firm: text(obj, "auditFirm").unwrap_or(defaults.audit_firm),
            opinion: text(obj, "opinion")
                .map(|s| parse_opinion(&s))
                .unwrap_or(defaults.opinion),
            period_start: text(obj, "periodStart").and_then(|s| parse_date(&s)),
            period_end: text(obj, "periodEnd").and_then(|s| parse_date(&s)),
            service_org_name: text(obj, "serviceOrgName").unwrap_or(defaults.service_org_name),
            trust_services_criteria: parse_criteria(obj.get("trustServicesCriteria")),
            system_description: text(obj, "systemDescription"),
        })
    }

    /// Parse the required `controls` section of a call result
    pub fn controls(&self, result: &Value, call: &str) -> Result<Vec<ExtractedControl>, ExtractorError> {
        let items = result.get("controls").ok_or_else(|| missing(call, "controls"))?;
        if !items.is_array() {
            return Err(ExtractorError::InvalidFormat(format!(
                "'controls' in {} result is not an array",
                call
            )));
        }

        let controls: Vec<ExtractedControl> = objects(Some(items), "control")
            .map(|obj| self.control(obj))
            .collect();

        debug!("Parsed {} controls from {}", controls.len(), call);
        Ok(controls)
    }

    fn control(&self, obj: &Map<String, Value>) -> ExtractedControl {
        let control_id = text(obj, "controlId").unwrap_or_else(|| {
            warn!("Control without an id");
            UNKNOWN_CONTROL_ID.to_string()
        });
        let description = text(obj, "description").unwrap_or_default();
        let category_code = resolve_category(
            text(obj, "tscCategory").as_deref(),
            &control_id,
            &description,
        );
        let test_result = text(obj, "testResult")
            .map(|s| parse_test_result(&s))
            .unwrap_or(TestResult::Exception);
        let confidence = obj
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(self.default_confidence);

        ExtractedControl {
            control_id,
            category_code,
            description,
            test_result,
            page_ref: page_ref(obj),
            confidence,
        }
    }

    /// Parse the optional `exceptions` section
    pub fn exceptions(&self, result: &Value) -> Vec<ExceptionRecord> {
        objects(result.get("exceptions"), "exception")
            .map(|obj| ExceptionRecord {
                control_id: text(obj, "controlId").unwrap_or_else(|| UNKNOWN_CONTROL_ID.to_string()),
                control_area: text(obj, "controlArea"),
                description: text(obj, "description").unwrap_or_default(),
                management_response: text(obj, "managementResponse"),
                page_ref: page_ref(obj),
            })
            .collect()
    }

    /// Parse the optional `subserviceOrgs` section
    pub fn subservice_orgs(&self, result: &Value) -> Vec<SubserviceOrg> {
        objects(result.get("subserviceOrgs"), "subservice org")
            .map(|obj| SubserviceOrg {
                name: text(obj, "name").unwrap_or_else(|| "Unknown".to_string()),
                service_description: text(obj, "serviceDescription").unwrap_or_default(),
                carve_out: obj.get("carveOut").and_then(Value::as_bool).unwrap_or(false),
                page_ref: page_ref(obj),
            })
            .collect()
    }

    /// Parse the optional `cuecs` section
    pub fn cuecs(&self, result: &Value) -> Vec<Cuec> {
        objects(result.get("cuecs"), "cuec")
            .map(|obj| Cuec {
                id: text(obj, "id"),
                description: text(obj, "description").unwrap_or_default(),
                customer_responsibility: text(obj, "customerResponsibility").unwrap_or_default(),
                related_control: text(obj, "relatedControl"),
                page_ref: page_ref(obj),
            })
            .collect()
    }
}

fn missing(call: &str, section: &str) -> ExtractorError {
    ExtractorError::MissingSection {
        call: call.to_string(),
        section: section.to_string(),
    }
}
