//! `qosverify check` command handler
//!
//! Runs the same preconditions a scenario runs before building its fixture,
//! in order, and stops at the first one that does not pass.

use std::io::Write;

use serde::Serialize;
use tracing::info;

use qosverify_cloud::OpenStackClient;
use qosverify_core::config::QosVerifyConfig;
use qosverify_scenario::{
    ScenarioError, check_allocation_possible, check_extensions, config_skip_reason,
};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const CONFIGURATION: &str = "configuration";
const EXTENSIONS: &str = "network extensions";
const CANDIDATES: &str = "allocation candidates";

/// Execute the `check` command.
///
/// A skipped check is not an error; a failed check exits with code 1.
pub async fn execute(config: &QosVerifyConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let mut report = CheckReport::default();

    if let Some(reason) = config_skip_reason(config) {
        report.push(CONFIGURATION, CheckStatus::Skip, reason);
    } else {
        report.push(
            CONFIGURATION,
            CheckStatus::Ok,
            format!(
                "physnet={}, compute={}, placement={}",
                config.network.qos_placement_physnet,
                config.compute.microversion,
                config.placement.microversion
            ),
        );

        let client = OpenStackClient::connect(config).await?;
        info!("connected, checking network extensions and allocation candidates");

        if report.record(EXTENSIONS, check_extensions(&client).await) {
            report.record(CANDIDATES, check_allocation_possible(&client).await);
        }
    }
    report.fill_not_run();

    writer.render(&report)?;

    if report.checks.iter().any(|c| c.status == CheckStatus::Fail) {
        return Err(CliError::Command("precondition check failed".to_owned()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Skip,
    Fail,
    NotRun,
}

#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

/// Precondition check report.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    /// True when every check passed and the scenarios can run.
    pub ready: bool,
    pub checks: Vec<CheckEntry>,
}

impl CheckReport {
    fn push(&mut self, name: &'static str, status: CheckStatus, detail: impl Into<String>) {
        self.checks.push(CheckEntry {
            name,
            status,
            detail: detail.into(),
        });
    }

    /// Records a check result. Returns true when the check passed.
    fn record(&mut self, name: &'static str, result: Result<(), ScenarioError>) -> bool {
        match result {
            Ok(()) => {
                self.push(name, CheckStatus::Ok, "");
                true
            }
            Err(ScenarioError::Skip(reason)) => {
                self.push(name, CheckStatus::Skip, reason);
                false
            }
            Err(e) => {
                self.push(name, CheckStatus::Fail, e.to_string());
                false
            }
        }
    }

    /// Marks the checks after the first non-passing one as not run.
    fn fill_not_run(&mut self) {
        for name in [CONFIGURATION, EXTENSIONS, CANDIDATES] {
            if !self.checks.iter().any(|c| c.name == name) {
                self.push(name, CheckStatus::NotRun, "");
            }
        }
        self.ready = self.checks.iter().all(|c| c.status == CheckStatus::Ok);
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        for c in &self.checks {
            let status = match c.status {
                CheckStatus::Ok => "OK".green().bold(),
                CheckStatus::Skip => "SKIP".yellow(),
                CheckStatus::Fail => "FAIL".red().bold(),
                CheckStatus::NotRun => "-".dimmed(),
            };
            if c.detail.is_empty() {
                writeln!(w, "{:<6} {}", status, c.name)?;
            } else {
                writeln!(w, "{:<6} {:<22} {}", status, c.name, c.detail)?;
            }
        }

        writeln!(w)?;
        if self.ready {
            writeln!(w, "{}", "Ready to run scenarios.".green().bold())?;
        } else {
            writeln!(w, "{}", "Scenarios would not run.".yellow().bold())?;
        }
        Ok(())
    }
}
