//! qosverify -- QoS minimum-bandwidth placement verification CLI
//!
//! Loads `qosverify.toml`, installs logging, and dispatches to one of the
//! subcommand handlers in [`commands`]. Errors are mapped to process exit
//! codes by [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;
use tracing::info;

use qosverify_core::config::QosVerifyConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    if let Err(e) = run(cli, &writer).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    // config 명령은 로드 실패 자체를 보고해야 하므로 에러를 바로 반환하지 않음
    let loaded = QosVerifyConfig::load(&cli.config).await;

    let general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    logging::init_tracing(&general, cli.log_level.as_deref())
        .map_err(|e| CliError::Config(format!("{e:#}")))?;

    info!(config = %cli.config.display(), "qosverify starting");

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
        Commands::Run(args) => commands::run::execute(args, &loaded?, writer).await,
        Commands::Check => commands::check::execute(&loaded?, writer).await,
        Commands::List => commands::list::execute(&loaded?, writer),
    }
}
