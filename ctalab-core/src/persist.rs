//! Strategy state persistence.
//!
//! The engine saves each strategy's variable snapshot and position after
//! every trade and on stop, and restores them on init. The concrete storage
//! engine is a collaborator behind [`StateStore`]; a JSON file store and an
//! in-memory store are provided.

use crate::error::PersistError;
use crate::strategy::StrategyState;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Abstract key-value persistence for strategy state.
pub trait StateStore: Send {
    fn save(&mut self, name: &str, state: &StrategyState) -> Result<(), PersistError>;
    fn load(&self, name: &str) -> Result<Option<StrategyState>, PersistError>;
    fn remove(&mut self, name: &str) -> Result<(), PersistError>;
}

/// Volatile store for tests and backtests (backtests start from zero state).
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: HashMap<String, StrategyState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn save(&mut self, name: &str, state: &StrategyState) -> Result<(), PersistError> {
        self.states.insert(name.to_string(), state.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<StrategyState>, PersistError> {
        Ok(self.states.get(name).cloned())
    }

    fn remove(&mut self, name: &str) -> Result<(), PersistError> {
        self.states.remove(name);
        Ok(())
    }
}

/// One JSON file per engine holding every strategy's state, rewritten on
/// each save.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    states: HashMap<String, StrategyState>,
}

impl JsonFileStore {
    /// Open the store, loading any existing file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref().to_path_buf();
        let states = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, states })
    }

    fn flush(&self) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.states)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn save(&mut self, name: &str, state: &StrategyState) -> Result<(), PersistError> {
        self.states.insert(name.to_string(), state.clone());
        self.flush()
    }

    fn load(&self, name: &str) -> Result<Option<StrategyState>, PersistError> {
        Ok(self.states.get(name).cloned())
    }

    fn remove(&mut self, name: &str) -> Result<(), PersistError> {
        if self.states.remove(name).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
