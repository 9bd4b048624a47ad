//! Merge per-call results into one extraction record

use crate::error::ExtractorError;
use crate::parser::ResultParser;
use crate::prompt::{
    CONTROLS_CALL, CONTROLS_CC1_CC5_CALL, CONTROLS_CC6_PLUS_CALL, FULL_CALL, METADATA_CALL,
};
use comply_domain::{ExtractionRecord, ExtractionStrategy};
use serde_json::Value;
use tracing::debug;

/// Combine the results of a strategy's calls
///
/// `results` must be in the order returned by [`crate::prompt::plan`].
/// Parallel controls are concatenated (CC1-CC5 first) without deduplication,
/// so a control id reported by both partitions appears twice.
pub fn merge_results(
    strategy: ExtractionStrategy,
    results: &[Value],
    parser: &ResultParser,
) -> Result<ExtractionRecord, ExtractorError> {
    if results.len() != strategy.expected_calls() {
        return Err(ExtractorError::Merge(format!(
            "{} expects {} results, got {}",
            strategy,
            strategy.expected_calls(),
            results.len()
        )));
    }

    let record = match (strategy, results) {
        (ExtractionStrategy::SinglePass, [full]) => ExtractionRecord::new(
            parser.metadata(full, FULL_CALL)?,
            parser.controls(full, FULL_CALL)?,
            parser.exceptions(full),
            parser.subservice_orgs(full),
            parser.cuecs(full),
        ),
        (ExtractionStrategy::TwoPass, [metadata, controls]) => ExtractionRecord::new(
            parser.metadata(metadata, METADATA_CALL)?,
            parser.controls(controls, CONTROLS_CALL)?,
            parser.exceptions(controls),
            parser.subservice_orgs(metadata),
            parser.cuecs(metadata),
        ),
        (ExtractionStrategy::Parallel, [metadata, low, high]) => {
            let mut controls = parser.controls(low, CONTROLS_CC1_CC5_CALL)?;
            controls.extend(parser.controls(high, CONTROLS_CC6_PLUS_CALL)?);

            ExtractionRecord::new(
                parser.metadata(metadata, METADATA_CALL)?,
                controls,
                parser.exceptions(high),
                parser.subservice_orgs(metadata),
                parser.cuecs(metadata),
            )
        }
        _ => {
            return Err(ExtractorError::Merge(format!(
                "unexpected result shape for {}",
                strategy
            )))
        }
    };

    debug!(
        "Merged {} results: {} controls, {} exceptions, {} subservice orgs, {} CUECs",
        strategy,
        record.controls.len(),
        record.exceptions.len(),
        record.subservice_orgs.len(),
        record.cuecs.len()
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn controls(prefix: &str, n: usize) -> Value {
        let items: Vec<Value> = (1..=n)
            .map(|i| {
                json!({
                    "controlId": format!("{}.{}", prefix, i),
                    "tscCategory": prefix,
                    "description": "control",
                    "testResult": "operating_effectively"
                })
            })
            .collect();
        Value::Array(items)
    }

    fn metadata_result() -> Value {
        json!({
            "metadata": {"reportType": "type2", "auditFirm": "Example LLP", "opinion": "unqualified"},
            "subserviceOrgs": [{"name": "AWS", "serviceDescription": "Hosting"}],
            "cuecs": [{"description": "Review access", "customerResponsibility": "Quarterly"}]
        })
    }

    #[test]
    fn test_single_pass_merge() {
        let full = json!({
            "metadata": {"auditFirm": "Example LLP"},
            "controls": controls("CC1", 2),
            "exceptions": [],
            "subserviceOrgs": [],
            "cuecs": []
        });

        let record =
            merge_results(ExtractionStrategy::SinglePass, &[full], &ResultParser::new(0.9)).unwrap();
        assert_eq!(record.controls.len(), 2);
        assert_eq!(record.metadata.audit_firm, "Example LLP");
    }

    #[test]
    fn test_two_pass_takes_sections_from_each_call() {
        let results = vec![
            metadata_result(),
            json!({
                "controls": controls("CC6", 3),
                "exceptions": [{"controlId": "CC6.2", "description": "Late revocation"}],
                "subserviceOrgs": [{"name": "ignored", "serviceDescription": ""}]
            }),
        ];

        let record =
            merge_results(ExtractionStrategy::TwoPass, &results, &ResultParser::new(0.9)).unwrap();
        assert_eq!(record.controls.len(), 3);
        assert_eq!(record.exceptions.len(), 1);
        assert_eq!(record.subservice_orgs.len(), 1);
        assert_eq!(record.subservice_orgs[0].name, "AWS");
        assert_eq!(record.cuecs.len(), 1);
    }

    #[test]
    fn test_parallel_concatenates_partitions() {
        let results = vec![
            metadata_result(),
            json!({"controls": controls("CC2", 4)}),
            json!({
                "controls": controls("CC7", 5),
                "exceptions": [{"controlId": "CC7.1", "description": "Missed alert"}]
            }),
        ];

        let record =
            merge_results(ExtractionStrategy::Parallel, &results, &ResultParser::new(0.9)).unwrap();
        assert_eq!(record.controls.len(), 4 + 5);
        assert_eq!(record.controls[0].control_id, "CC2.1");
        assert_eq!(record.controls[4].control_id, "CC7.1");
        assert_eq!(record.exceptions.len(), 1);
    }

    #[test]
    fn test_parallel_keeps_duplicate_ids() {
        let results = vec![
            metadata_result(),
            json!({"controls": [{"controlId": "CC5.1", "tscCategory": "CC5", "testResult": "exception"}]}),
            json!({"controls": [{"controlId": "CC5.1", "tscCategory": "CC5", "testResult": "operating_effectively"}]}),
        ];

        let record =
            merge_results(ExtractionStrategy::Parallel, &results, &ResultParser::new(0.9)).unwrap();
        assert_eq!(record.controls.len(), 2);
        assert!(record.controls.iter().all(|c| c.control_id == "CC5.1"));
    }

    #[test]
    fn test_wrong_result_count() {
        let err = merge_results(
            ExtractionStrategy::TwoPass,
            &[metadata_result()],
            &ResultParser::new(0.9),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractorError::Merge(_)));
    }

    #[test]
    fn test_missing_partition_controls_fails() {
        let results = vec![metadata_result(), json!({}), json!({"controls": []})];
        let err =
            merge_results(ExtractionStrategy::Parallel, &results, &ResultParser::new(0.9)).unwrap_err();
        assert!(err.to_string().contains("controls_cc1_cc5"));
    }
}
