//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use qosverify_scenario::ScenarioKind;

/// qosverify -- QoS minimum-bandwidth placement verification.
///
/// Use `qosverify <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "qosverify", version, about, long_about = None)]
pub struct Cli {
    /// Path to the qosverify.toml configuration file.
    #[arg(short, long, global = true, default_value = "qosverify.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run minimum-bandwidth allocation scenarios.
    Run(RunArgs),

    /// Check whether the cloud can run the scenarios, without booting anything.
    Check,

    /// List scenarios and whether the configuration skips them.
    List,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run the selected scenarios (default: all) and report pass / skip / fail.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario to run (basic, migrate, resize). Repeat to select several.
    #[arg(short, long = "scenario", value_parser = parse_scenario)]
    pub scenarios: Vec<ScenarioKind>,
}

impl RunArgs {
    /// Selected scenarios in canonical order, all of them when none was given.
    pub fn selected(&self) -> Vec<ScenarioKind> {
        if self.scenarios.is_empty() {
            return ScenarioKind::ALL.to_vec();
        }
        ScenarioKind::ALL
            .into_iter()
            .filter(|k| self.scenarios.contains(k))
            .collect()
    }
}

fn parse_scenario(s: &str) -> Result<ScenarioKind, String> {
    s.parse()
}

// ---- config ----

/// Manage qosverify configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, auth, endpoints, compute,
        /// compute_feature_enabled, network, placement).
        #[arg(long)]
        section: Option<String>,
    },
}
