//! In-memory KeyValueStore with an optional byte quota.

use crate::domain::DomainError;
use crate::ports::KeyValueStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Memory-backed store. With a quota, writes that would exceed it fail like a full browser store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn used_bytes(items: &BTreeMap<String, String>) -> usize {
        items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut items = self.items.lock();
        if let Some(quota) = self.quota_bytes {
            let replaced = items.get(key).map_or(0, |old| key.len() + old.len());
            let after = Self::used_bytes(&items) - replaced + key.len() + value.len();
            if after > quota {
                return Err(DomainError::QuotaExceeded(format!(
                    "{} bytes needed, quota is {}",
                    after, quota
                )));
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), DomainError> {
        self.items.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.items.lock().keys().cloned().collect())
    }
}
