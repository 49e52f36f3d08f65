use std::fs;
use std::path::{Path, PathBuf};

use garden_core::EngineConfig;

use crate::config::{default_data_dir, load_config};
use crate::error::{Result, StoreError};
use crate::store::ContactStore;

/// A garden on disk: the contact database plus its engine config.
///
/// ```text
/// ~/.relationship-garden/
/// ├── garden.db
/// └── garden.toml   (optional)
/// ```
pub struct Garden {
    store: ContactStore,
    config: EngineConfig,
    data_dir: Option<PathBuf>,
}

impl Garden {
    /// Open the garden under `data_dir` (default: [`default_data_dir`]),
    /// creating the directory as needed.
    pub fn open(data_dir: Option<&Path>) -> Result<Self> {
        let dir = data_dir.map(PathBuf::from).unwrap_or_else(default_data_dir);
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", dir.display()))
        })?;

        let config = load_config(&dir)?;
        let store = ContactStore::open(&dir.join("garden.db"))?;

        Ok(Self {
            store,
            config,
            data_dir: Some(dir),
        })
    }

    /// In-memory store with default config (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: ContactStore::open_in_memory()?,
            config: EngineConfig::default(),
            data_dir: None,
        })
    }

    pub fn store(&self) -> &ContactStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}
