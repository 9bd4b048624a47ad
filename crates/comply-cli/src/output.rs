//! Output formatting for the CLI.

use crate::commands::estimate::EstimateReport;
use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use comply_coverage::{CoverageGap, CoverageLevel, CoverageResult, MappingTable};
use serde_json::json;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the articles of a mapping table.
    pub fn format_mapping(&self, table: &MappingTable) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(table)?),
            OutputFormat::Quiet => Ok(table
                .articles
                .iter()
                .map(|a| a.article_id.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Article", "Title", "Categories", "Weight"]);

                for article in &table.articles {
                    builder.push_record([
                        article.article_id.clone(),
                        article.title.clone(),
                        article.categories.join(", "),
                        format!("{:.2}", article.weight),
                    ]);
                }

                Ok(format!(
                    "{}\n{}",
                    self.heading(&format!(
                        "{} mapping: {} articles",
                        table.framework.to_uppercase(),
                        table.len()
                    )),
                    render(builder)
                ))
            }
        }
    }

    /// Format a size estimate and the strategy it selects.
    pub fn format_estimate(&self, report: &EstimateReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report.strategy.to_string()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                builder.push_record(["File".to_string(), report.file.clone()]);
                builder.push_record(["Bytes".to_string(), report.bytes.to_string()]);
                builder.push_record(["Estimated pages".to_string(), report.pages.to_string()]);
                builder.push_record(["Estimated tokens".to_string(), report.tokens.to_string()]);
                builder.push_record(["Strategy".to_string(), report.strategy.to_string()]);
                builder.push_record(["Model calls".to_string(), report.expected_calls.to_string()]);
                Ok(render(builder))
            }
        }
    }

    /// Format a coverage result and its gap report.
    pub fn format_coverage(
        &self,
        result: &CoverageResult,
        gaps: &[CoverageGap],
        gaps_only: bool,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = if gaps_only {
                    json!({ "gaps": gaps })
                } else {
                    json!({ "coverage": result, "gaps": gaps })
                };
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => {
                if gaps_only {
                    Ok(gaps
                        .iter()
                        .map(|g| g.article_id.as_str())
                        .collect::<Vec<_>>()
                        .join("\n"))
                } else {
                    Ok(format!("{:.3}", result.overall_score))
                }
            }
            OutputFormat::Table => {
                let mut sections = Vec::new();

                if !gaps_only {
                    sections.push(self.heading(&format!(
                        "{} coverage: {:.3} ({} of {} articles covered)",
                        result.framework.to_uppercase(),
                        result.overall_score,
                        result.articles_covered,
                        result.articles_total
                    )));

                    let mut builder = Builder::default();
                    builder.push_record(["Article", "Level", "Confidence", "Controls", "Evidence"]);
                    for assessment in &result.per_article {
                        builder.push_record([
                            assessment.article_id.clone(),
                            self.level(assessment.level),
                            format!("{:.2}", assessment.confidence),
                            assessment.matched_controls.to_string(),
                            assessment
                                .representative_control_id
                                .clone()
                                .unwrap_or_else(|| "-".to_string()),
                        ]);
                    }
                    sections.push(render(builder));
                }

                if gaps.is_empty() {
                    sections.push(self.success("No gaps found."));
                } else {
                    sections.push(self.heading(&format!("Gaps: {}", gaps.len())));

                    let mut builder = Builder::default();
                    builder.push_record(["Article", "Level", "Weight", "Remediation"]);
                    for gap in gaps {
                        builder.push_record([
                            gap.article_id.clone(),
                            self.level(gap.level),
                            format!("{:.2}", gap.weight),
                            gap.remediation.clone(),
                        ]);
                    }
                    sections.push(render(builder));
                }

                Ok(sections.join("\n"))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    fn heading(&self, text: &str) -> String {
        if self.color_enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn level(&self, level: CoverageLevel) -> String {
        let color = match level {
            CoverageLevel::Full => "green",
            CoverageLevel::Partial => "yellow",
            CoverageLevel::None => "red",
        };
        self.colorize(level.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn render(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use comply_coverage::{gap_report, CoverageScorer};
    use comply_domain::ExtractionStrategy;

    fn report() -> EstimateReport {
        EstimateReport {
            file: "soc2.pdf".to_string(),
            bytes: 2_000_000,
            pages: 40,
            tokens: 10_320,
            strategy: ExtractionStrategy::SinglePass,
            expected_calls: 1,
        }
    }

    #[test]
    fn test_mapping_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_mapping(&MappingTable::dora()).unwrap();
        assert!(output.contains("DORA mapping: 18 articles"));
        assert!(output.contains("Article 28"));
        assert!(output.contains("Categories"));
    }

    #[test]
    fn test_mapping_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_mapping(&MappingTable::dora()).unwrap();
        assert_eq!(output.lines().count(), 18);
        assert_eq!(output.lines().next(), Some("Article 5"));
    }

    #[test]
    fn test_estimate_formats() {
        let table = Formatter::new(OutputFormat::Table, false)
            .format_estimate(&report())
            .unwrap();
        assert!(table.contains("single_pass"));
        assert!(table.contains("Estimated pages"));

        let json = Formatter::new(OutputFormat::Json, false)
            .format_estimate(&report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pages"], 40);
        assert_eq!(value["strategy"], "single_pass");

        let quiet = Formatter::new(OutputFormat::Quiet, false)
            .format_estimate(&report())
            .unwrap();
        assert_eq!(quiet, "single_pass");
    }

    #[test]
    fn test_coverage_formats() {
        let scorer = CoverageScorer::dora();
        let result = scorer.score(&[]);
        let gaps = gap_report(&result, scorer.table());

        let table = Formatter::new(OutputFormat::Table, false)
            .format_coverage(&result, &gaps, false)
            .unwrap();
        assert!(table.contains("DORA coverage: 0.000 (0 of 18 articles covered)"));
        assert!(table.contains("Gaps: 18"));

        let quiet = Formatter::new(OutputFormat::Quiet, false)
            .format_coverage(&result, &gaps, false)
            .unwrap();
        assert_eq!(quiet, "0.000");

        let json = Formatter::new(OutputFormat::Json, false)
            .format_coverage(&result, &gaps, true)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("coverage").is_none());
        assert_eq!(value["gaps"].as_array().unwrap().len(), 18);
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("done"), "✓ done");
        assert_eq!(formatter.error("bad"), "✗ bad");
    }
}
