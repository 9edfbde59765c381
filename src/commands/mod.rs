pub mod config;
pub mod preview;
pub mod state;
pub mod stock;
pub mod watch;

use crate::api::{WidgetClient, with_retry};
use crate::config::Config;
use crate::stock::StockRecord;
use crate::store::FileTargetStore;
use crate::timer::TimerRecord;
use crate::timer::clock::{Clock, SystemClock};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Where a widget record comes from: a saved JSON response or the live API.
#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
    Remote(String),
}

impl Source {
    pub fn from_args(file: Option<PathBuf>, id: Option<String>) -> Result<Self> {
        match (file, id) {
            (Some(path), None) => Ok(Source::File(path)),
            (None, Some(id)) => Ok(Source::Remote(id)),
            (Some(_), Some(_)) => anyhow::bail!("Pass either a record file or --id, not both"),
            (None, None) => anyhow::bail!("A record file or --id is required"),
        }
    }
}

fn read_record<T: DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse record JSON in {}", path.display()))
}

pub(crate) fn client(config: &Config) -> WidgetClient {
    WidgetClient::new(&config.api.base_url)
}

pub fn load_timer(config: &Config, source: &Source) -> Result<TimerRecord> {
    let record: TimerRecord = match source {
        Source::File(path) => read_record(path)?,
        Source::Remote(id) => {
            let client = client(config);
            with_retry(|| client.get_timer(id), config.api.retries)?
        }
    };
    if !record.is_published {
        tracing::warn!(timer_id = ?record.timer_id, "timer is not published");
    }
    Ok(record)
}

pub fn load_stock(config: &Config, source: &Source) -> Result<StockRecord> {
    match source {
        Source::File(path) => read_record(path),
        Source::Remote(id) => {
            let client = client(config);
            with_retry(|| client.get_stock(id), config.api.retries)
        }
    }
}

pub(crate) fn system_clock(config: &Config) -> Result<SystemClock> {
    Ok(SystemClock::new(config.engine.offset()?))
}

pub(crate) fn current_time(config: &Config) -> Result<chrono::DateTime<chrono::FixedOffset>> {
    Ok(system_clock(config)?.now())
}

pub(crate) fn open_store(config: &Config) -> Result<FileTargetStore> {
    FileTargetStore::open(config.state.state_dir_override.as_ref())
}
