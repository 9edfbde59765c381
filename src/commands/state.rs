use crate::OutputFormat;
use crate::commands::open_store;
use crate::config::Config;
use crate::store::TargetStore;
use crate::timer::engine::parse_persisted;
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StoredTarget {
    key: String,
    value: String,
    valid: bool,
}

/// Show persisted fixed-timer targets.
pub fn list(config: &Config, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let targets: Vec<StoredTarget> = store
        .list()?
        .into_iter()
        .map(|(key, value)| StoredTarget {
            valid: parse_persisted(&value).is_some(),
            key,
            value,
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&targets).context("Failed to serialize targets")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if targets.is_empty() {
                println!("No persisted targets in {}", store.state_path().display());
                return Ok(());
            }
            for target in &targets {
                let marker = if target.valid { "" } else { " (corrupt)" };
                println!("{}\t{}{}", target.key, target.value, marker);
            }
        }
    }
    Ok(())
}

/// Forget one persisted target, or all of them.
pub fn clear(config: &Config, key: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    match key {
        Some(key) => {
            if store.get(key)?.is_none() {
                println!("No persisted target for {}", key);
                return Ok(());
            }
            store.remove(key)?;
            println!("✓ Cleared {}", key);
        }
        None => {
            let removed = store.clear()?;
            println!("✓ Cleared {} persisted target(s)", removed);
        }
    }
    Ok(())
}
