//! Configuration management for shiftpipe
//!
//! Values are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`ShiftpipeConfig::default`])
//! 2. A TOML file: `--config <FILE>` if given, otherwise `shiftpipe.toml` in the working directory
//! 3. Environment variables prefixed `SHIFTPIPE_`, nested with `__`
//!    (for example `SHIFTPIPE_LOG__MAX_BYTES=1048576`)
//!
//! Command-line flags are applied on top by the CLI.

use crate::logging::LogSinkConfig;
use crate::pipeline::PipelineOptions;
use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;


/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "shiftpipe.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SHIFTPIPE_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShiftpipeConfig {
    pub pipeline: PipelineConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Shift used when `--shift` is not given
    pub default_shift: i64,

    /// Upper bound on workers (0 = no cap beyond the load estimate)
    pub max_workers: usize,

    /// How long CPU load is sampled before sizing the pool
    pub sample_window_ms: u64,

    /// Where per-run scratch directories are created (default: next to the output)
    pub scratch_dir: Option<PathBuf>,

    /// Channel buffer size multiplier (buffer = workers * multiplier)
    pub channel_buffer_multiplier: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_shift: 3,
            max_workers: 0,
            sample_window_ms: 1000,
            scratch_dir: None,
            channel_buffer_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,

    /// Origin label written into every record
    pub origin: String,

    /// Active log size that triggers rotation
    pub max_bytes: u64,

    pub flush_interval_ms: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("app.log"),
            origin: "CAESAR_CIPHER".to_string(),
            max_bytes: 5 * 1024 * 1024,
            flush_interval_ms: 500,
        }
    }
}

impl ShiftpipeConfig {
    /// Load, merge and validate configuration.
    pub fn load(custom_config: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_config
            && !path.is_file()
        {
            bail!("Config file not found: {}", path.display());
        }

        let config: Self = Self::figment(custom_config)
            .extract()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(custom_config: Option<&Path>) -> Figment {
        let file = custom_config.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.log.max_bytes == 0 {
            bail!("log.max_bytes must be greater than zero");
        }
        if self.log.flush_interval_ms == 0 {
            bail!("log.flush_interval_ms must be greater than zero");
        }
        if self.log.origin.trim().is_empty() {
            bail!("log.origin must not be empty");
        }
        if self.pipeline.channel_buffer_multiplier == 0 {
            bail!("pipeline.channel_buffer_multiplier must be greater than zero");
        }
        Ok(())
    }

    pub fn sink_config(&self) -> LogSinkConfig {
        LogSinkConfig {
            path: self.log.file.clone(),
            max_bytes: self.log.max_bytes,
            flush_interval: Duration::from_millis(self.log.flush_interval_ms),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            sample_window: Duration::from_millis(self.pipeline.sample_window_ms),
            scratch_dir: self.pipeline.scratch_dir.clone(),
            channel_buffer_multiplier: self.pipeline.channel_buffer_multiplier,
        }
    }

    /// Worker cap from the CLI if given, else from config (0 means none).
    pub fn worker_cap(&self, cli_cap: Option<usize>) -> Option<usize> {
        cli_cap.or(match self.pipeline.max_workers {
            0 => None,
            n => Some(n),
        })
    }
}
