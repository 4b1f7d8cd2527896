//! `qosverify run` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use qosverify_cloud::OpenStackClient;
use qosverify_core::config::QosVerifyConfig;
use qosverify_scenario::{
    RunReport, ScenarioKind, ScenarioOutcome, ScenarioResult, ScenarioRunnerBuilder,
};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Returns `CliError::ScenarioFailed` (exit code 1) when any scenario failed.
/// Skipped scenarios do not affect the exit code.
pub async fn execute(
    args: RunArgs,
    config: &QosVerifyConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let kinds = args.selected();

    let report = match skipped_by_config(&kinds, config) {
        Some(report) => {
            info!("every selected scenario is skipped by configuration, not connecting");
            report
        }
        None => {
            let client = OpenStackClient::connect(config).await?;
            let runner = ScenarioRunnerBuilder::new()
                .config(config.clone())
                .cloud(Arc::new(client))
                .build()?;
            runner.run(&kinds).await
        }
    };

    let summary = RunSummary::from(report);
    writer.render(&summary)?;

    if summary.failed > 0 {
        return Err(CliError::ScenarioFailed {
            failed: summary.failed,
            total: summary.results.len(),
        });
    }

    Ok(())
}

/// Builds the report without touching the cloud when configuration alone
/// skips every selected scenario.
fn skipped_by_config(kinds: &[ScenarioKind], config: &QosVerifyConfig) -> Option<RunReport> {
    let mut results = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let reason = kind.skip_reason(config)?;
        results.push(ScenarioResult {
            name: kind.name().to_owned(),
            idempotent_id: kind.idempotent_id().to_owned(),
            outcome: ScenarioOutcome::Skipped { reason },
            elapsed_ms: 0,
            cleanup_errors: Vec::new(),
        });
    }
    Some(RunReport { results })
}

/// Run report with pass / skip / fail counts.
#[derive(Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<ScenarioResult>,
}

impl From<RunReport> for RunSummary {
    fn from(report: RunReport) -> Self {
        Self {
            passed: report.passed(),
            skipped: report.skipped(),
            failed: report.failed(),
            results: report.results,
        }
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{:<8} {:<38} {:>9}", "Result", "Scenario", "Elapsed")?;
        writeln!(w, "{}", "-".repeat(57))?;

        for r in &self.results {
            let label = match &r.outcome {
                ScenarioOutcome::Passed => "PASSED".green().bold(),
                ScenarioOutcome::Skipped { .. } => "SKIPPED".yellow(),
                ScenarioOutcome::Failed { .. } => "FAILED".red().bold(),
            };
            writeln!(
                w,
                "{:<8} {:<38} {:>7}ms",
                label, r.name, r.elapsed_ms
            )?;

            match &r.outcome {
                ScenarioOutcome::Skipped { reason } => writeln!(w, "         {}", reason.dimmed())?,
                ScenarioOutcome::Failed { reason } => writeln!(w, "         {}", reason.red())?,
                ScenarioOutcome::Passed => {}
            }
            for c in &r.cleanup_errors {
                writeln!(
                    w,
                    "         {} {}: {}",
                    "cleanup:".yellow(),
                    c.action,
                    c.error
                )?;
            }
        }

        writeln!(w)?;
        let totals = format!(
            "{} passed, {} skipped, {} failed",
            self.passed, self.skipped, self.failed
        );
        if self.failed > 0 {
            writeln!(w, "{}", totals.red().bold())?;
        } else {
            writeln!(w, "{}", totals.green().bold())?;
        }

        Ok(())
    }
}
