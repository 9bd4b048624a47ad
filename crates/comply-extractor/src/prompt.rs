//! Prompts and output schemas for each extraction call
//!
//! Every strategy issues a fixed list of calls. Each call pairs a prompt,
//! assembled by [`PromptBuilder`], with a JSON Schema describing the object
//! the model must return. Field names are camelCase throughout.

use comply_domain::ExtractionStrategy;
use comply_llm::ExtractionCall;
use serde_json::{json, Value};

/// Label of the single-pass call
pub const FULL_CALL: &str = "full";
/// Label of the metadata call (two-pass and parallel)
pub const METADATA_CALL: &str = "metadata";
/// Label of the all-controls call (two-pass)
pub const CONTROLS_CALL: &str = "controls";
/// Label of the CC1-CC5 partition call (parallel)
pub const CONTROLS_CC1_CC5_CALL: &str = "controls_cc1_cc5";
/// Label of the CC6+ partition call (parallel)
pub const CONTROLS_CC6_PLUS_CALL: &str = "controls_cc6_plus";

const PREAMBLE: &str = "You are reading a SOC 2 audit report (Type 1 or Type 2). \
Work from the attached document only. Do not invent values; omit optional \
fields you cannot find.";

const CATEGORY_GUIDE: &str = "TSC category codes:
- CC1 control environment (governance, ethics, oversight)
- CC2 communication and information
- CC3 risk assessment
- CC4 monitoring activities
- CC5 control activities
- CC6 logical and physical access
- CC7 system operations (incidents, detection, recovery)
- CC8 change management
- CC9 risk mitigation (vendors, business continuity)
- A availability
- PI processing integrity
- C confidentiality
- P privacy
Control ids usually look like CC6.1, A1.2, PI1.3, C1.1 or P4.2. Some auditors \
use their own ids (SEC-01, AC-2); keep those as written and still assign the \
category code.";

const TEST_RESULT_GUIDE: &str = "testResult values:
- operating_effectively: \"no exceptions noted\", \"operating effectively\"
- exception: \"exception noted\", any deviation or finding
- not_tested: \"not tested\", \"not applicable\", or only described in a Type 1 report";

const METADATA_GUIDE: &str = "metadata fields: reportType (type1 or type2), auditFirm, \
opinion (unqualified, qualified or adverse), periodStart and periodEnd (YYYY-MM-DD), \
serviceOrgName, trustServicesCriteria (security, availability, processing_integrity, \
confidentiality, privacy), systemDescription (two sentences at most).";

const OUTPUT_REMINDER: &str = "Return a single JSON object that matches the \
response schema. No markdown, no commentary.";

/// Assembles an extraction prompt from shared sections
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    task: String,
    sections: Vec<&'static str>,
}

impl PromptBuilder {
    /// Create a builder for a task description
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            sections: Vec::new(),
        }
    }

    /// Include the metadata field guide
    pub fn with_metadata_guide(mut self) -> Self {
        self.sections.push(METADATA_GUIDE);
        self
    }

    /// Include the category code and test result guides
    pub fn with_control_guide(mut self) -> Self {
        self.sections.push(CATEGORY_GUIDE);
        self.sections.push(TEST_RESULT_GUIDE);
        self
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\n");
        prompt.push_str(&self.task);
        prompt.push_str("\n\n");

        for section in &self.sections {
            prompt.push_str(section);
            prompt.push_str("\n\n");
        }

        prompt.push_str(OUTPUT_REMINDER);
        prompt
    }
}

fn metadata_schema() -> Value {
    json!({
        "type": "object",
        "required": ["reportType", "auditFirm", "opinion", "periodStart", "periodEnd", "serviceOrgName"],
        "properties": {
            "reportType": {"type": "string", "enum": ["type1", "type2"]},
            "auditFirm": {"type": "string"},
            "opinion": {"type": "string", "enum": ["unqualified", "qualified", "adverse"]},
            "periodStart": {"type": "string"},
            "periodEnd": {"type": "string"},
            "serviceOrgName": {"type": "string"},
            "trustServicesCriteria": {
                "type": "array",
                "items": {
                    "type": "string",
                    "enum": ["security", "availability", "processing_integrity", "confidentiality", "privacy"]
                }
            },
            "systemDescription": {"type": "string"}
        }
    })
}

fn controls_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": {
            "type": "object",
            "required": ["controlId", "tscCategory", "description", "testResult"],
            "properties": {
                "controlId": {"type": "string"},
                "tscCategory": {"type": "string"},
                "description": {"type": "string"},
                "testResult": {
                    "type": "string",
                    "enum": ["operating_effectively", "exception", "not_tested"]
                },
                "pageRef": {"type": "integer"}
            }
        }
    })
}

fn exceptions_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["controlId", "description"],
            "properties": {
                "controlId": {"type": "string"},
                "controlArea": {"type": "string"},
                "description": {"type": "string"},
                "managementResponse": {"type": "string"},
                "pageRef": {"type": "integer"}
            }
        }
    })
}

fn subservice_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["name", "serviceDescription"],
            "properties": {
                "name": {"type": "string"},
                "serviceDescription": {"type": "string"},
                "carveOut": {"type": "boolean"},
                "pageRef": {"type": "integer"}
            }
        }
    })
}

fn cuecs_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["description", "customerResponsibility"],
            "properties": {
                "id": {"type": "string"},
                "description": {"type": "string"},
                "customerResponsibility": {"type": "string"},
                "relatedControl": {"type": "string"},
                "pageRef": {"type": "integer"}
            }
        }
    })
}

/// Schema of the single-pass result
pub fn full_schema() -> Value {
    json!({
        "type": "object",
        "required": ["metadata", "controls", "exceptions", "subserviceOrgs", "cuecs"],
        "properties": {
            "metadata": metadata_schema(),
            "controls": controls_schema("Every control in the report"),
            "exceptions": exceptions_schema(),
            "subserviceOrgs": subservice_schema(),
            "cuecs": cuecs_schema()
        }
    })
}

/// Schema of the metadata call
pub fn metadata_call_schema() -> Value {
    json!({
        "type": "object",
        "required": ["metadata"],
        "properties": {
            "metadata": metadata_schema(),
            "documentStats": {
                "type": "object",
                "properties": {
                    "totalControls": {"type": "integer"},
                    "totalExceptions": {"type": "integer"},
                    "hasSubserviceOrgs": {"type": "boolean"},
                    "hasCuecs": {"type": "boolean"},
                    "controlSectionPages": {"type": "string"}
                }
            },
            "subserviceOrgs": subservice_schema(),
            "cuecs": cuecs_schema()
        }
    })
}

/// Schema of a controls call, with or without exceptions
pub fn controls_call_schema(scope: &str, with_exceptions: bool) -> Value {
    let mut schema = json!({
        "type": "object",
        "required": ["controls"],
        "properties": {
            "controls": controls_schema(scope)
        }
    });

    if with_exceptions {
        schema["required"] = json!(["controls", "exceptions"]);
        schema["properties"]["exceptions"] = exceptions_schema();
    }

    schema
}

fn full_call() -> ExtractionCall {
    let prompt = PromptBuilder::new(
        "Extract everything in one response: report metadata, every control with \
its test result, every exception with the management response, subservice \
organizations (note carve-outs), and complementary user entity controls (CUECs).",
    )
    .with_metadata_guide()
    .with_control_guide()
    .build();

    ExtractionCall::new(FULL_CALL, prompt, full_schema())
}

fn metadata_call() -> ExtractionCall {
    let prompt = PromptBuilder::new(
        "Extract the report metadata, subservice organizations (note carve-outs) and \
complementary user entity controls (CUECs). In documentStats, estimate how many \
controls and exceptions the report contains. Do not list controls.",
    )
    .with_metadata_guide()
    .build();

    ExtractionCall::new(METADATA_CALL, prompt, metadata_call_schema())
}

fn controls_call() -> ExtractionCall {
    let prompt = PromptBuilder::new(
        "Extract every control in the report with its test result, and every \
exception with the management response. Do not skip controls.",
    )
    .with_control_guide()
    .build();

    ExtractionCall::new(
        CONTROLS_CALL,
        prompt,
        controls_call_schema("Every control in the report", true),
    )
}

fn controls_cc1_cc5_call() -> ExtractionCall {
    let prompt = PromptBuilder::new(
        "Extract only controls in categories CC1, CC2, CC3, CC4 and CC5 with their \
test results. Ignore every other category.",
    )
    .with_control_guide()
    .build();

    ExtractionCall::new(
        CONTROLS_CC1_CC5_CALL,
        prompt,
        controls_call_schema("Controls in CC1-CC5 only", false),
    )
}

fn controls_cc6_plus_call() -> ExtractionCall {
    let prompt = PromptBuilder::new(
        "Extract only controls in categories CC6, CC7, CC8, CC9, A, PI, C and P with \
their test results, and every exception in the report with the management \
response. Ignore CC1-CC5 controls.",
    )
    .with_control_guide()
    .build();

    ExtractionCall::new(
        CONTROLS_CC6_PLUS_CALL,
        prompt,
        controls_call_schema("Controls in CC6-CC9, A, PI, C and P", true),
    )
}

/// The calls a strategy issues, in merge order
pub fn plan(strategy: ExtractionStrategy) -> Vec<ExtractionCall> {
    match strategy {
        ExtractionStrategy::SinglePass => vec![full_call()],
        ExtractionStrategy::TwoPass => vec![metadata_call(), controls_call()],
        ExtractionStrategy::Parallel => vec![
            metadata_call(),
            controls_cc1_cc5_call(),
            controls_cc6_plus_call(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_matches_expected_calls() {
        for strategy in [
            ExtractionStrategy::SinglePass,
            ExtractionStrategy::TwoPass,
            ExtractionStrategy::Parallel,
        ] {
            assert_eq!(plan(strategy).len(), strategy.expected_calls());
        }
    }

    #[test]
    fn test_plan_labels() {
        let labels: Vec<String> = plan(ExtractionStrategy::Parallel)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(
            labels,
            vec![METADATA_CALL, CONTROLS_CC1_CC5_CALL, CONTROLS_CC6_PLUS_CALL]
        );
    }

    #[test]
    fn test_prompt_sections() {
        let prompt = PromptBuilder::new("Extract things").with_control_guide().build();
        assert!(prompt.starts_with(PREAMBLE));
        assert!(prompt.contains("Extract things"));
        assert!(prompt.contains("CC9 risk mitigation"));
        assert!(prompt.contains("operating_effectively"));
        assert!(prompt.ends_with(OUTPUT_REMINDER));
        assert!(!prompt.contains("auditFirm"));
    }

    #[test]
    fn test_partition_schemas() {
        let cc1 = controls_call_schema("CC1-CC5", false);
        assert!(cc1["properties"].get("exceptions").is_none());
        assert_eq!(cc1["required"], json!(["controls"]));

        let cc6 = controls_call_schema("CC6+", true);
        assert_eq!(cc6["required"], json!(["controls", "exceptions"]));
        assert_eq!(cc6["properties"]["exceptions"]["type"], "array");
    }

    #[test]
    fn test_full_schema_requires_every_section() {
        let schema = full_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
        assert_eq!(
            schema["properties"]["controls"]["items"]["properties"]["testResult"]["enum"][2],
            "not_tested"
        );
    }
}
