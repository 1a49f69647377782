//! Embedded `sled` backend for [`KeyValueStore`]

use super::KeyValueStore;
use crate::error::{PocketchatError, Result};
use async_trait::async_trait;
use directories::ProjectDirs;
use sled::Db;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default store location
pub const STORE_PATH_ENV: &str = "POCKETCHAT_STORE_PATH";

/// Durable key-value store backed by an embedded `sled` database
///
/// Every write is flushed before returning so a completed `set` survives a
/// crash of the process.
pub struct SledStore {
    db: Db,
    path: PathBuf,
}

impl SledStore {
    /// Open the store at the default location
    ///
    /// Honors `POCKETCHAT_STORE_PATH` when set; otherwise uses the platform
    /// data directory (for example `~/.local/share/pocketchat/store`).
    ///
    /// # Errors
    ///
    /// Returns `PocketchatError::Storage` if the data directory cannot be
    /// determined or the database cannot be opened
    pub fn open_default() -> Result<Self> {
        if let Ok(override_path) = std::env::var(STORE_PATH_ENV) {
            return Self::open(override_path);
        }
        Self::open(default_store_path()?)
    }

    /// Open or create a store at `path`
    ///
    /// Parent directories are created as needed.
    ///
    /// # Examples
    ///
    /// ```
    /// use pocketchat::storage::SledStore;
    ///
    /// # fn main() -> pocketchat::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("store"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PocketchatError::Storage(format!("Failed to create store directory: {}", e))
            })?;
        }

        let db = sled::open(&path)
            .map_err(|e| PocketchatError::Storage(format!("Failed to open database: {}", e)))?;

        tracing::debug!("Opened sled store at {}", path.display());
        Ok(Self { db, path })
    }

    /// Location of the database directory
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Platform data directory location of the store
pub fn default_store_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("dev", "pocketchat", "pocketchat").ok_or_else(|| {
        PocketchatError::Storage("Could not determine data directory".to_string())
    })?;
    Ok(proj_dirs.data_dir().join("store"))
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .get(key.as_bytes())
            .map_err(|e| PocketchatError::Storage(format!("Get failed: {}", e)))?;

        match value {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    PocketchatError::Storage(format!("Value for {} is not UTF-8: {}", key, e))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| PocketchatError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| PocketchatError::Storage(format!("Flush failed: {}", e)))?;

        tracing::debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| PocketchatError::Storage(format!("Remove failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| PocketchatError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for result in self.db.iter().keys() {
            let key =
                result.map_err(|e| PocketchatError::Storage(format!("Iteration failed: {}", e)))?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}
