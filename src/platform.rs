//! Where persisted countdown targets and the config file live.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = ".shop-countdown";

const STATE_LOCK: &str = "state.lock";
const STATE_FILE: &str = "state.json";

/// Directory holding the target store.
///
/// An explicit override must be writable. Otherwise the first writable of
/// `~/.shop-countdown`, the platform data dir and `./.shop-countdown` wins.
pub fn get_state_dir(override_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        ensure_writable(dir)?;
        return Ok(dir.clone());
    }

    let candidates = [
        home::home_dir().map(|home| home.join(APP_DIR)),
        dirs::data_local_dir().map(|data| data.join("shop-countdown")),
        Some(PathBuf::from(APP_DIR)),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|dir| match ensure_writable(dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Skipping state directory {}: {:#}", dir.display(), e);
                false
            }
        })
        .context("No writable state directory; set state.state_dir_override in config")
}

/// Create `dir` if needed and check that a file can be written into it.
pub fn ensure_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let marker = dir.join(".write_test");
    fs::write(&marker, b"")
        .with_context(|| format!("Directory {} is not writable", dir.display()))?;
    let _ = fs::remove_file(&marker);
    Ok(())
}

/// Lock file and state file of the target store.
pub fn state_paths(state_dir_override: Option<&PathBuf>) -> Result<(PathBuf, PathBuf)> {
    let dir = get_state_dir(state_dir_override)?;
    Ok((dir.join(STATE_LOCK), dir.join(STATE_FILE)))
}

/// `~/.shop-countdown/config.toml`
pub fn config_path() -> Result<PathBuf> {
    let home = home::home_dir().context("Could not find home directory")?;
    Ok(home.join(APP_DIR).join("config.toml"))
}
