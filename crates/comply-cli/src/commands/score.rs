//! Score command implementation.

use crate::cli::ScoreArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use comply_coverage::{gap_report, CoverageScorer, MappingTable, ScoringConfig};
use comply_domain::{ExtractionRecord, PersistedRecord};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Execute the score command.
pub fn execute_score(args: ScoreArgs, table: MappingTable, formatter: &Formatter) -> Result<()> {
    let record = load_record(&args.record)?;
    let scorer = CoverageScorer::new(Arc::new(table), ScoringConfig::default());

    let result = scorer.score(&record.controls);
    let gaps = gap_report(&result, scorer.table());

    println!("{}", formatter.format_coverage(&result, &gaps, args.gaps_only)?);
    Ok(())
}

/// Read a stored record, or a bare extraction record, from a JSON file.
pub fn load_record(path: &Path) -> Result<ExtractionRecord> {
    let contents = fs::read_to_string(path)?;

    if let Ok(persisted) = serde_json::from_str::<PersistedRecord>(&contents) {
        debug!("Read stored record from {}", path.display());
        return Ok(persisted.to_record());
    }

    serde_json::from_str::<ExtractionRecord>(&contents).map_err(|e| {
        CliError::InvalidInput(format!(
            "{} is not an extraction record: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use comply_domain::{
        ConfidenceScores, ExtractedControl, ExtractionStrategy, RawExtractionStats,
        ReportMetadata, TestResult,
    };
    use tempfile::TempDir;

    fn record() -> ExtractionRecord {
        let controls = ["CC9.1", "CC9.2"]
            .iter()
            .map(|id| ExtractedControl {
                control_id: id.to_string(),
                category_code: "CC9".to_string(),
                description: "Vendors are reviewed".to_string(),
                test_result: TestResult::Effective,
                page_ref: Some(40),
                confidence: 0.9,
            })
            .collect();
        ExtractionRecord::new(ReportMetadata::default(), controls, vec![], vec![], vec![])
    }

    #[test]
    fn test_load_stored_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stored.json");
        let original = record();
        let persisted = PersistedRecord::from_record(
            &original,
            RawExtractionStats {
                parser_version: "test".to_string(),
                extraction_strategy: ExtractionStrategy::SinglePass,
                api_calls_count: 1,
                processing_time_ms: 10,
            },
            ConfidenceScores::for_record(&original),
        );
        fs::write(&path, serde_json::to_string(&persisted).unwrap()).unwrap();

        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded.controls.len(), 2);
        assert_eq!(loaded.controls[0].control_id, "CC9.1");
    }

    #[test]
    fn test_load_extraction_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("record.json");
        fs::write(&path, serde_json::to_string(&record()).unwrap()).unwrap();

        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded, record());
    }

    #[test]
    fn test_rejects_other_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.json");
        fs::write(&path, r#"{"hello": "world"}"#).unwrap();

        assert!(matches!(load_record(&path), Err(CliError::InvalidInput(_))));
    }
}
