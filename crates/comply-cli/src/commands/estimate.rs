//! Estimate command implementation.

use crate::cli::EstimateArgs;
use crate::error::Result;
use crate::output::Formatter;
use comply_domain::ExtractionStrategy;
use comply_extractor::{select_strategy, ExtractorConfig, SizeEstimate};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Size estimate of a document and the strategy it would be parsed with.
#[derive(Debug, Clone, Serialize)]
pub struct EstimateReport {
    /// File that was measured
    pub file: String,
    /// Size in bytes
    pub bytes: u64,
    /// Estimated pages
    pub pages: usize,
    /// Estimated model tokens
    pub tokens: usize,
    /// Selected strategy
    pub strategy: ExtractionStrategy,
    /// Model calls the strategy makes
    pub expected_calls: usize,
}

/// Execute the estimate command.
pub fn execute_estimate(
    args: EstimateArgs,
    config: &ExtractorConfig,
    formatter: &Formatter,
) -> Result<()> {
    let report = build_report(&args.file, config)?;
    println!("{}", formatter.format_estimate(&report)?);
    Ok(())
}

/// Measure a file without reading its contents.
pub fn build_report(path: &Path, config: &ExtractorConfig) -> Result<EstimateReport> {
    let bytes = fs::metadata(path)?.len();
    let len = usize::try_from(bytes).unwrap_or(usize::MAX);
    let size = SizeEstimate::from_len(len, config.bytes_per_page, config.tokens_per_page);
    let strategy = select_strategy(size.pages, config);

    Ok(EstimateReport {
        file: path.display().to_string(),
        bytes,
        pages: size.pages,
        tokens: size.tokens,
        strategy,
        expected_calls: strategy.expected_calls(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, len: usize) -> std::path::PathBuf {
        let path = dir.path().join("report.pdf");
        fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn test_small_file_is_single_pass() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, 10);
        let report = build_report(&path, &ExtractorConfig::default()).unwrap();

        assert_eq!(report.bytes, 10);
        assert_eq!(report.pages, 1);
        assert_eq!(report.strategy, ExtractionStrategy::SinglePass);
        assert_eq!(report.expected_calls, 1);
    }

    #[test]
    fn test_configured_page_size_changes_strategy() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, 1000);
        let config = ExtractorConfig {
            bytes_per_page: 1,
            ..Default::default()
        };
        let report = build_report(&path, &config).unwrap();

        assert_eq!(report.pages, 1000);
        assert_eq!(report.strategy, ExtractionStrategy::Parallel);
        assert_eq!(report.expected_calls, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = build_report(&dir.path().join("absent.pdf"), &ExtractorConfig::default());
        assert!(result.is_err());
    }
}
