//! Comply CLI - inspect extraction strategy and regulatory coverage.

use clap::Parser;
use comply_cli::commands;
use comply_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> comply_cli::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };
    let config = Config::load_from(&config_path)?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Mapping => {
            let table = config.mapping_table(cli.mapping.as_deref())?;
            commands::execute_mapping(&table, &formatter)?;
        }
        Command::Estimate(args) => {
            commands::execute_estimate(args, &config.extractor_config(), &formatter)?;
        }
        Command::Score(args) => {
            let table = config.mapping_table(cli.mapping.as_deref())?;
            commands::execute_score(args, table, &formatter)?;
        }
        Command::Config(args) => {
            commands::execute_config(args, &config, &config_path, &formatter)?;
        }
    }

    Ok(())
}
