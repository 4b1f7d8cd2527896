//! `qosverify list` command handler

use std::io::Write;

use serde::Serialize;

use qosverify_core::config::QosVerifyConfig;
use qosverify_scenario::ScenarioKind;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command. Does not contact the cloud.
pub fn execute(config: &QosVerifyConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let listing = build_listing(config);
    writer.render(&listing)?;
    Ok(())
}

fn build_listing(config: &QosVerifyConfig) -> ScenarioListing {
    let scenarios = ScenarioKind::ALL
        .into_iter()
        .map(|kind| {
            let skip_reason = kind.skip_reason(config);
            ScenarioEntry {
                name: kind.name(),
                short_name: kind.short_name(),
                idempotent_id: kind.idempotent_id(),
                description: kind.description(),
                runnable: skip_reason.is_none(),
                skip_reason,
            }
        })
        .collect();
    ScenarioListing { scenarios }
}

#[derive(Serialize)]
pub struct ScenarioListing {
    pub scenarios: Vec<ScenarioEntry>,
}

#[derive(Serialize)]
pub struct ScenarioEntry {
    pub name: &'static str,
    pub short_name: &'static str,
    pub idempotent_id: &'static str,
    pub description: &'static str,
    pub runnable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Render for ScenarioListing {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "{:<8} {:<38} {:<36} Status",
            "Short", "Name", "Id"
        )?;
        writeln!(w, "{}", "-".repeat(96))?;

        for s in &self.scenarios {
            let status = match &s.skip_reason {
                None => "runnable".green().to_string(),
                Some(reason) => format!("{} ({})", "skip".yellow(), reason),
            };
            writeln!(
                w,
                "{:<8} {:<38} {:<36} {}",
                s.short_name, s.name, s.idempotent_id, status
            )?;
        }
        Ok(())
    }
}
