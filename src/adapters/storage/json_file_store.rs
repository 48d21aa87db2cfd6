//! Implements KeyValueStore using a JSON file.
//!
//! The whole map lives in memory behind an RwLock and is flushed on every write.

use crate::domain::DomainError;
use crate::ports::KeyValueStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::warn;

/// JSON file-based key/value storage.
pub struct JsonFileStore {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open and load in one step.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let store = Self::new(path);
        store.load().await?;
        Ok(store)
    }

    /// Load items from disk. A missing or corrupt file starts empty.
    pub async fn load(&self) -> Result<(), DomainError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "store file is corrupt; starting empty"
                );
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        *self.items.write().await = data;
        Ok(())
    }

    /// Write-replace: temp file, fsync, rename over the target.
    async fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), DomainError> {
        let json = serde_json::to_string(items).map_err(|e| DomainError::Store(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Store(format!("create store dir: {}", e)))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::Store(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::Store(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::Store(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::Store(format!("atomic rename failed: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut items = self.items.write().await;
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&items).await {
            // Keep memory and disk in step.
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), DomainError> {
        let mut items = self.items.write().await;
        if items.remove(key).is_some() {
            self.persist(&items).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set_item("realty_cache_a", "1").await.unwrap();
        store.set_item("other", "2").await.unwrap();
        store.remove_item("other").await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_item("realty_cache_a").await.unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(reopened.get_item("other").await.unwrap(), None);
        assert_eq!(reopened.keys().await.unwrap(), vec!["realty_cache_a"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }
}
