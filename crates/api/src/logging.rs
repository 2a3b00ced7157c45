use anyhow::{bail, Result};
use oraclefeed_indexer::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CRATES: [&str; 4] = [
    "oraclefeed",
    "oraclefeed_api",
    "oraclefeed_indexer",
    "tower_http",
];

/// Directive string applying `level` to the workspace crates.
pub fn default_directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level unless `debug` is set.
pub fn init_logging(config: &LoggingConfig, debug: bool) -> Result<()> {
    let env_filter = if debug {
        EnvFilter::new(default_directives("debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        "pretty" => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()?,
        other => bail!("Unknown log format '{}'", other),
    }

    Ok(())
}
