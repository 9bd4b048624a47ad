//! Comply CLI library.
//!
//! Command-line access to the offline parts of the extraction pipeline:
//! the mapping table, document size estimates with the strategy they select,
//! and coverage scoring of stored records with a gap report.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
