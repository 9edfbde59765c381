//! Persistence side-channel for fixed countdown targets, keyed by
//! `persistence_key`.

use crate::state::{State, with_state_lock};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub trait TargetStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Atomic read-modify-write of a single key. `f` sees the current value
    /// and returns the value to store, or `None` to leave the key untouched.
    fn update(&self, key: &str, f: &mut dyn FnMut(Option<&str>) -> Option<String>) -> Result<()>;

    fn list(&self) -> Result<Vec<(String, String)>>;
}

impl<T: TargetStore + ?Sized> TargetStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(Option<&str>) -> Option<String>) -> Result<()> {
        (**self).update(key, f)
    }

    fn list(&self) -> Result<Vec<(String, String)>> {
        (**self).list()
    }
}

/// Targets kept in the locked JSON state file, shared across processes.
#[derive(Debug, Clone)]
pub struct FileTargetStore {
    lock_path: PathBuf,
    state_path: PathBuf,
}

impl FileTargetStore {
    pub fn new(lock_path: PathBuf, state_path: PathBuf) -> Self {
        Self {
            lock_path,
            state_path,
        }
    }

    /// Store rooted at a state directory (see [`crate::platform::state_paths`]).
    pub fn open(state_dir_override: Option<&PathBuf>) -> Result<Self> {
        let (lock_path, state_path) = crate::platform::state_paths(state_dir_override)?;
        Ok(Self::new(lock_path, state_path))
    }

    pub fn state_path(&self) -> &PathBuf {
        &self.state_path
    }

    /// Drop every stored target. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        with_state_lock(&self.lock_path, &self.state_path, |state| {
            let removed = state.targets.len();
            state.targets.clear();
            Ok(removed)
        })
    }
}

impl TargetStore for FileTargetStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        // Reads tolerate a concurrent writer; the rename in `State::save` is atomic
        let state = State::load(&self.state_path)?;
        Ok(state.targets.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        with_state_lock(&self.lock_path, &self.state_path, |state| {
            state.targets.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        with_state_lock(&self.lock_path, &self.state_path, |state| {
            state.targets.remove(key);
            Ok(())
        })
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(Option<&str>) -> Option<String>) -> Result<()> {
        with_state_lock(&self.lock_path, &self.state_path, |state| {
            if let Some(value) = f(state.targets.get(key).map(String::as_str)) {
                state.targets.insert(key.to_string(), value);
            }
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<(String, String)>> {
        let state = State::load(&self.state_path)?;
        Ok(state.targets.into_iter().collect())
    }
}

/// Process-local store, used by previews and tests.
#[derive(Debug, Default)]
pub struct MemoryTargetStore {
    targets: Mutex<HashMap<String, String>>,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.targets
            .lock()
            .map_err(|_| anyhow!("target store mutex poisoned"))
    }
}

impl TargetStore for MemoryTargetStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.locked()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.locked()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.locked()?.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(Option<&str>) -> Option<String>) -> Result<()> {
        let mut targets = self.locked()?;
        if let Some(value) = f(targets.get(key).map(String::as_str)) {
            targets.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, String)>> {
        let mut entries: Vec<_> = self
            .locked()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_update_sees_previous_value() {
        let store = MemoryTargetStore::new();
        store.set("k", "first").unwrap();

        let mut seen = None;
        store
            .update("k", &mut |current| {
                seen = current.map(str::to_string);
                Some("second".to_string())
            })
            .unwrap();

        assert_eq!(seen.as_deref(), Some("first"));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_update_returning_none_leaves_value() {
        let store = MemoryTargetStore::new();
        store.set("k", "kept").unwrap();
        store.update("k", &mut |_| None).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileTargetStore::new(
            temp.path().join("state.lock"),
            temp.path().join("state.json"),
        );

        assert!(store.get("timer-cd-endtime-1").unwrap().is_none());
        store
            .set("timer-cd-endtime-1", "2026-10-19T12:00:00+00:00")
            .unwrap();
        store.set("timer-cd-endtime-2", "garbage").unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
        store.remove("timer-cd-endtime-2").unwrap();
        assert_eq!(
            store.get("timer-cd-endtime-1").unwrap().as_deref(),
            Some("2026-10-19T12:00:00+00:00")
        );
        assert!(store.get("timer-cd-endtime-2").unwrap().is_none());
    }
}
