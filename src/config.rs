use crate::api::client::DEFAULT_BASE_URL;
use crate::timer::clock::parse_offset;
use crate::timer::scheduler::Cadence;
use anyhow::{Context, Result};
use chrono::FixedOffset;
use config::{Config as ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Storefront API root, e.g. `https://countdown.example.com/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_retries() -> u32 {
    3
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            retries: default_retries(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EngineConfig {
    /// Fixed UTC offset ("+05:30") used as the shopper's local time.
    /// Unset means the host's local offset.
    pub utc_offset: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CadenceConfig {
    #[serde(default = "default_active_ms")]
    pub active_ms: u64,
    #[serde(default = "default_pending_ms")]
    pub pending_ms: u64,
    #[serde(default = "default_inactive_ms")]
    pub inactive_ms: u64,
    #[serde(default = "default_recheck_ms")]
    pub recheck_ms: u64,
}

fn default_active_ms() -> u64 {
    1_000
}

fn default_pending_ms() -> u64 {
    10_000
}

fn default_inactive_ms() -> u64 {
    30_000
}

fn default_recheck_ms() -> u64 {
    1_000
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            active_ms: default_active_ms(),
            pending_ms: default_pending_ms(),
            inactive_ms: default_inactive_ms(),
            recheck_ms: default_recheck_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StateConfig {
    /// Optional override for state directory (for testing)
    pub state_dir_override: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "Invalid api.base_url '{}', expected an http:// or https:// URL",
                self.base_url
            );
        }
        Ok(())
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.offset().map(|_| ())
    }

    pub fn offset(&self) -> Result<Option<FixedOffset>> {
        match &self.utc_offset {
            None => Ok(None),
            Some(raw) => parse_offset(raw)
                .map(Some)
                .with_context(|| format!("Invalid engine.utc_offset '{}', expected +HH:MM", raw)),
        }
    }
}

impl CadenceConfig {
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("active_ms", self.active_ms),
            ("pending_ms", self.pending_ms),
            ("inactive_ms", self.inactive_ms),
            ("recheck_ms", self.recheck_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                anyhow::bail!("cadence.{} must be greater than 0", name);
            }
        }
        Ok(())
    }

    pub fn to_cadence(&self) -> Cadence {
        Cadence {
            active: Duration::from_millis(self.active_ms),
            pending: Duration::from_millis(self.pending_ms),
            inactive: Duration::from_millis(self.inactive_ms),
            recheck: Duration::from_millis(self.recheck_ms),
        }
    }
}

impl Config {
    /// Validate all configuration
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.engine.validate()?;
        self.cadence.validate()?;
        Ok(())
    }
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let loader = ConfigBuilder::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .build()
        .context("Failed to build config loader")?;

    loader
        .try_deserialize()
        .context("Failed to parse config file")
}

/// Load a config file, falling back to defaults when it does not exist.
/// The caller decides how to report the missing file.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }

    let config = load_from_path(path)?;
    config.validate()?;
    Ok(config)
}

pub fn save_to_path<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(path.as_ref(), toml_string).context("Failed to write config file")?;

    Ok(())
}
