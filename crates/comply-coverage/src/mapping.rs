//! Regulatory mapping tables
//!
//! A table associates each article of a target framework with the SOC 2
//! category codes that evidence it. Tables are built once and shared
//! read-only by every scorer.

use crate::CoverageError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One article and the categories that cover it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMapping {
    /// Article identifier (e.g. `Article 5`)
    pub article_id: String,

    /// Article title
    pub title: String,

    /// What the article requires
    #[serde(default)]
    pub description: String,

    /// Category codes whose controls evidence this article
    pub categories: Vec<String>,

    /// Relative importance in (0, 1]
    pub weight: f64,
}

impl ArticleMapping {
    fn new(article_id: &str, title: &str, description: &str, categories: &[&str], weight: f64) -> Self {
        Self {
            article_id: article_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            weight,
        }
    }

    /// Whether a category code is among the required ones (case-insensitive)
    pub fn requires(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }

    /// Remediation hint for an uncovered article
    pub fn remediation(&self) -> String {
        format!(
            "Implement controls addressing {} to meet {} requirements.",
            self.categories.join(", "),
            self.article_id
        )
    }
}

/// An immutable table of article mappings for one framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTable {
    /// Framework code (e.g. `dora`)
    pub framework: String,

    /// Articles in presentation order
    pub articles: Vec<ArticleMapping>,
}

impl MappingTable {
    /// The built-in DORA to SOC 2 TSC table
    pub fn dora() -> Self {
        let articles = vec![
            // Chapter II: ICT risk management
            ArticleMapping::new(
                "Article 5",
                "ICT risk management framework",
                "Governance and accountability for ICT risk management",
                &["CC1", "CC3", "CC4", "CC9"],
                1.0,
            ),
            ArticleMapping::new(
                "Article 6",
                "ICT systems, protocols and tools",
                "ICT systems resilience and protection",
                &["CC6", "CC7", "CC8", "A"],
                1.0,
            ),
            ArticleMapping::new(
                "Article 7",
                "Identification",
                "Identification of ICT risks and business functions",
                &["CC3", "CC6"],
                0.8,
            ),
            ArticleMapping::new(
                "Article 8",
                "Protection and prevention",
                "ICT security policies and access controls",
                &["CC5", "CC6", "CC7", "C"],
                1.0,
            ),
            ArticleMapping::new(
                "Article 9",
                "Detection",
                "Detection of anomalous activities and incidents",
                &["CC7", "CC4"],
                0.8,
            ),
            ArticleMapping::new(
                "Article 10",
                "Response and recovery",
                "Incident response and recovery procedures",
                &["CC7", "CC9", "A"],
                1.0,
            ),
            ArticleMapping::new(
                "Article 11",
                "Backup policies and procedures",
                "Data backup and restoration",
                &["A", "CC7", "CC9"],
                0.9,
            ),
            ArticleMapping::new(
                "Article 12",
                "Learning and evolving",
                "Lessons learned and continuous improvement",
                &["CC4", "CC3"],
                0.6,
            ),
            ArticleMapping::new(
                "Article 13",
                "Communication",
                "Crisis communication procedures",
                &["CC2", "CC7"],
                0.7,
            ),
            // Chapter III: incident reporting
            ArticleMapping::new(
                "Article 17",
                "ICT-related incident management process",
                "Incident classification and management",
                &["CC7", "CC2"],
                1.0,
            ),
            ArticleMapping::new(
                "Article 18",
                "Classification of ICT-related incidents",
                "Incident classification criteria",
                &["CC7"],
                0.8,
            ),
            ArticleMapping::new(
                "Article 19",
                "Reporting of major ICT-related incidents",
                "Regulatory incident reporting",
                &["CC7", "CC2"],
                1.0,
            ),
            // Chapter IV: resilience testing
            ArticleMapping::new(
                "Article 24",
                "General requirements for testing",
                "Testing program requirements",
                &["CC4", "CC7", "A"],
                0.9,
            ),
            ArticleMapping::new(
                "Article 25",
                "Testing of ICT tools and systems",
                "Vulnerability assessments and testing",
                &["CC7", "CC8", "A"],
                0.8,
            ),
            // Chapter V: third-party risk
            ArticleMapping::new(
                "Article 28",
                "General principles for third-party risk",
                "Third-party ICT risk management strategy",
                &["CC9"],
                1.0,
            ),
            ArticleMapping::new(
                "Article 29",
                "Preliminary assessment of ICT concentration risk",
                "Concentration risk assessment",
                &["CC3", "CC9"],
                0.8,
            ),
            ArticleMapping::new(
                "Article 30",
                "Key contractual provisions",
                "Contract requirements for ICT services",
                &["CC9"],
                0.9,
            ),
            // Chapter VI: information sharing
            ArticleMapping::new(
                "Article 45",
                "Information sharing arrangements",
                "Threat intelligence sharing",
                &["CC2", "CC7"],
                0.5,
            ),
        ];

        Self {
            framework: "dora".to_string(),
            articles,
        }
    }

    /// Build a table from parts, validating it
    pub fn new(framework: impl Into<String>, articles: Vec<ArticleMapping>) -> Result<Self, CoverageError> {
        let table = Self {
            framework: framework.into(),
            articles,
        };
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate a table from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, CoverageError> {
        let table: Self =
            toml::from_str(toml_str).map_err(|e| CoverageError::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CoverageError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoverageError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, CoverageError> {
        toml::to_string_pretty(self).map_err(|e| CoverageError::Parse(e.to_string()))
    }

    /// Check the table invariants
    ///
    /// Article ids are unique, every article names at least one category,
    /// and weights lie in (0, 1].
    pub fn validate(&self) -> Result<(), CoverageError> {
        if self.articles.is_empty() {
            return Err(CoverageError::InvalidMapping(
                "table has no articles".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for article in &self.articles {
            if !seen.insert(article.article_id.as_str()) {
                return Err(CoverageError::InvalidMapping(format!(
                    "duplicate article {}",
                    article.article_id
                )));
            }
            if article.categories.is_empty() {
                return Err(CoverageError::InvalidMapping(format!(
                    "{} has no categories",
                    article.article_id
                )));
            }
            if !(article.weight > 0.0 && article.weight <= 1.0) {
                return Err(CoverageError::InvalidMapping(format!(
                    "{} weight {} is outside (0, 1]",
                    article.article_id, article.weight
                )));
            }
        }

        Ok(())
    }

    /// Look up an article by id
    pub fn get(&self, article_id: &str) -> Option<&ArticleMapping> {
        self.articles.iter().find(|a| a.article_id == article_id)
    }

    /// Number of articles
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether the table has no articles
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Sum of all article weights
    pub fn total_weight(&self) -> f64 {
        self.articles.iter().map(|a| a.weight).sum()
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::dora()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_dora_table_is_valid() {
        let table = MappingTable::dora();
        assert!(table.validate().is_ok());
        assert_eq!(table.len(), 18);
        assert_eq!(table.framework, "dora");
    }

    #[test]
    fn test_dora_article_contents() {
        let table = MappingTable::dora();

        let art6 = table.get("Article 6").unwrap();
        assert_eq!(art6.categories, vec!["CC6", "CC7", "CC8", "A"]);
        assert_eq!(art6.weight, 1.0);

        let art45 = table.get("Article 45").unwrap();
        assert_eq!(art45.weight, 0.5);
        assert!(art45.requires("cc2"));
        assert!(!art45.requires("CC9"));

        assert!(table.get("Article 99").is_none());
    }

    #[test]
    fn test_remediation_text() {
        let table = MappingTable::dora();
        assert_eq!(
            table.get("Article 7").unwrap().remediation(),
            "Implement controls addressing CC3, CC6 to meet Article 7 requirements."
        );
    }

    #[test]
    fn test_validate_rejects_bad_weights_and_duplicates() {
        let bad_weight = ArticleMapping::new("A1", "T", "", &["CC1"], 0.0);
        assert!(MappingTable::new("x", vec![bad_weight]).is_err());

        let too_heavy = ArticleMapping::new("A1", "T", "", &["CC1"], 1.5);
        assert!(MappingTable::new("x", vec![too_heavy]).is_err());

        let a = ArticleMapping::new("A1", "T", "", &["CC1"], 1.0);
        assert!(MappingTable::new("x", vec![a.clone(), a]).is_err());

        let empty = ArticleMapping::new("A1", "T", "", &[], 1.0);
        assert!(MappingTable::new("x", vec![empty]).is_err());

        assert!(MappingTable::new("x", Vec::new()).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let table = MappingTable::dora();
        let toml_str = table.to_toml().unwrap();
        let parsed = MappingTable::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
framework = "custom"

[[articles]]
article_id = "R1"
title = "Access"
categories = ["CC6"]
weight = 0.5
"#
        )
        .unwrap();

        let table = MappingTable::from_file(file.path()).unwrap();
        assert_eq!(table.framework, "custom");
        assert_eq!(table.articles[0].description, "");
        assert!(matches!(
            MappingTable::from_file("/nonexistent/mapping.toml"),
            Err(CoverageError::Io(_))
        ));
    }
}
