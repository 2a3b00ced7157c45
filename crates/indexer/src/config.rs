//! Configuration management for oraclefeed.
//!
//! Configuration is loaded from a TOML file. `${VAR_NAME}` placeholders are
//! expanded from the environment before parsing, so secrets such as RPC keys
//! can stay out of the file. `PORT`, when set, overrides `server.port`.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use oraclefeed_core::DEFAULT_STORE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::listener::retry::RetryConfig;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Contract addresses
    pub contracts: ContractsConfig,

    /// Historical backfill
    pub backfill: BackfillConfig,

    /// Snapshot files
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint used for the backfill
    pub rpc_url: String,
}

/// Contract addresses configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Oracle contract emitting `NewReport`
    pub flex: Address,

    /// Autopay contract emitting `TipAdded`
    pub autopay: Address,
}

/// Backfill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Run the backfill at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First block of the range (inclusive)
    pub start_block: u64,

    /// Last block of the range (inclusive); absent means the chain head
    #[serde(default)]
    pub end_block: Option<u64>,

    /// Blocks per `eth_getLogs` window
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Retries per RPC call after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-call timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot of value reports
    #[serde(default = "default_new_report_path")]
    pub new_report_path: PathBuf,

    /// JSON snapshot of tips
    #[serde(default = "default_tip_added_path")]
    pub tip_added_path: PathBuf,

    /// Records retained per store
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_new_report_path() -> PathBuf {
    PathBuf::from("./eventData.json")
}

fn default_tip_added_path() -> PathBuf {
    PathBuf::from("./eventData1.json")
}

fn default_capacity() -> usize {
    DEFAULT_STORE_CAPACITY
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            new_report_path: default_new_report_path(),
            tip_added_path: default_tip_added_path(),
            capacity: default_capacity(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BackfillConfig {
    /// Retry policy settings for RPC calls.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: 2.0,
        }
    }

    /// Per-call RPC timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Example
    /// ```no_run
    /// # use oraclefeed_indexer::config::Config;
    /// let config = Config::from_file("oraclefeed.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)
            .with_context(|| format!("Failed to expand config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string (no env expansion or overrides).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {}", port))?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            anyhow::bail!("Network RPC URL cannot be empty");
        }

        if self.contracts.flex.is_zero() {
            anyhow::bail!("Contracts flex must be a non-zero address");
        }
        if self.contracts.autopay.is_zero() {
            anyhow::bail!("Contracts autopay must be a non-zero address");
        }

        if self.backfill.batch_size == 0 {
            anyhow::bail!("Backfill batch_size must be > 0");
        }
        if self.backfill.request_timeout_secs == 0 {
            anyhow::bail!("Backfill request_timeout_secs must be > 0");
        }
        if self.backfill.initial_backoff_ms > self.backfill.max_backoff_ms {
            anyhow::bail!(
                "Backfill initial_backoff_ms ({}) cannot exceed max_backoff_ms ({})",
                self.backfill.initial_backoff_ms,
                self.backfill.max_backoff_ms
            );
        }
        if let Some(end_block) = self.backfill.end_block {
            if end_block < self.backfill.start_block {
                anyhow::bail!(
                    "Backfill end_block ({}) cannot be before start_block ({})",
                    end_block,
                    self.backfill.start_block
                );
            }
        }

        if self.storage.capacity == 0 {
            anyhow::bail!("Storage capacity must be > 0");
        }
        if self.storage.new_report_path == self.storage.tip_added_path {
            anyhow::bail!("Storage new_report_path and tip_added_path must differ");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }
}

/// Expand `${VAR_NAME}` placeholders from the environment.
///
/// Placeholders inside `#` comments are left alone; a `#` inside a quoted
/// string does not start a comment. Multi-line strings are not tracked.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut output = String::with_capacity(input.len());

    for (line_no, line) in input.split_inclusive('\n').enumerate() {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut rest = line;

        while let Some(ch) = rest.chars().next() {
            if quote.is_none() && ch == '#' {
                output.push_str(rest);
                break;
            }

            if ch == '$' && rest[1..].starts_with('{') {
                let body = &rest[2..];
                let end = body.find('}').with_context(|| {
                    format!("Unclosed environment variable placeholder on line {}", line_no + 1)
                })?;
                let name = &body[..end];
                if name.is_empty() {
                    anyhow::bail!("Empty environment variable name on line {}", line_no + 1);
                }
                let value = std::env::var(name).with_context(|| {
                    format!(
                        "Environment variable '{}' is not set (referenced on line {})",
                        name,
                        line_no + 1
                    )
                })?;
                output.push_str(&value);
                rest = &body[end + 1..];
                continue;
            }

            match quote {
                Some('"') if escaped => escaped = false,
                Some('"') if ch == '\\' => escaped = true,
                Some(q) if ch == q => quote = None,
                None if ch == '"' || ch == '\'' => quote = Some(ch),
                _ => {}
            }

            output.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    Ok(output)
}
