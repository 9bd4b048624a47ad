//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use comply_coverage::MappingTable;
use comply_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mapping table TOML file; the built-in DORA table when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_path: Option<PathBuf>,

    /// Extraction constants used by `estimate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<ExtractorConfig>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".comply").join("config.toml"))
    }

    /// Load configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from a file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        if let Some(extractor) = &config.extractor {
            extractor.validate().map_err(CliError::Config)?;
        }
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Extraction constants, falling back to defaults.
    pub fn extractor_config(&self) -> ExtractorConfig {
        self.extractor.clone().unwrap_or_default()
    }

    /// Load the mapping table, preferring `override_path` over the configured one.
    pub fn mapping_table(&self, override_path: Option<&Path>) -> Result<MappingTable> {
        match override_path.or(self.mapping_path.as_deref()) {
            Some(path) => {
                debug!("Loading mapping table from {}", path.display());
                Ok(MappingTable::from_file(path)?)
            }
            None => Ok(MappingTable::dora()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.extractor.is_none());
        assert!(config.mapping_path.is_none());
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert_eq!(config.extractor_config(), ExtractorConfig::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.extractor.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.settings.format = OutputFormat::Json;
        config.extractor = Some(ExtractorConfig {
            single_pass_max_pages: 60,
            ..Default::default()
        });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.settings.format, OutputFormat::Json);
        assert_eq!(loaded.extractor_config().single_pass_max_pages, 60);
        assert_eq!(loaded.extractor_config().two_pass_max_pages, 150);
    }

    #[test]
    fn test_partial_extractor_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extractor]\nbytes_per_page = 40000\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        let extractor = config.extractor_config();
        assert_eq!(extractor.bytes_per_page, 40_000);
        assert_eq!(extractor.single_pass_max_pages, 80);
    }

    #[test]
    fn test_invalid_extractor_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[extractor]\nsingle_pass_max_pages = 200\ntwo_pass_max_pages = 150\n",
        )
        .unwrap();

        assert!(matches!(Config::load_from(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_mapping_table_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.toml");
        let table = MappingTable::dora();
        fs::write(&path, table.to_toml().unwrap()).unwrap();

        let config = Config::default();
        assert_eq!(config.mapping_table(None).unwrap().len(), 18);
        assert_eq!(config.mapping_table(Some(&path)).unwrap().len(), 18);
        assert!(config
            .mapping_table(Some(&dir.path().join("missing.toml")))
            .is_err());
    }
}
