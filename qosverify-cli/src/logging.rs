//! Logging initialization for the qosverify CLI.
//!
//! The `[general]` section picks the format and the default level; `--log-level`
//! replaces that level and `RUST_LOG` replaces both. Everything is written to
//! stderr so that `--output json` keeps stdout machine-readable.

use anyhow::{Context, Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use qosverify_core::config::GeneralConfig;

type FmtLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global tracing subscriber.
///
/// Must be called once, before the first command handler runs.
pub fn init_tracing(config: &GeneralConfig, level_override: Option<&str>) -> Result<()> {
    let fmt_layer = fmt_layer(&config.log_format)?;
    let level = effective_level(config, level_override);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .with_context(|| format!("failed to install {} tracing subscriber", config.log_format))
}

fn effective_level<'a>(config: &'a GeneralConfig, level_override: Option<&'a str>) -> &'a str {
    level_override.unwrap_or(config.log_level.as_str())
}

fn fmt_layer(format: &str) -> Result<FmtLayer> {
    let layer = match format {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };
    Ok(layer)
}
