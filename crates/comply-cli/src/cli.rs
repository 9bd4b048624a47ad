//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Comply CLI - Inspect SOC 2 extraction strategy and DORA coverage.
#[derive(Debug, Parser)]
#[command(name = "comply")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "COMPLY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mapping table TOML file (overrides the configured table)
    #[arg(short, long, global = true)]
    pub mapping: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (one value per line)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the articles of the mapping table
    Mapping,

    /// Estimate a document's size and extraction strategy
    Estimate(EstimateArgs),

    /// Score a stored extraction record and report gaps
    Score(ScoreArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the estimate command.
#[derive(Debug, Parser)]
pub struct EstimateArgs {
    /// Document to estimate
    pub file: PathBuf,
}

/// Arguments for the score command.
#[derive(Debug, Parser)]
pub struct ScoreArgs {
    /// JSON file holding a stored record (or an extraction record)
    pub record: PathBuf,

    /// Only print the gap report
    #[arg(long)]
    pub gaps_only: bool,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
