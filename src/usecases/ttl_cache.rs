//! Persistent TTL cache over a key/value store.
//!
//! Entries are namespaced by a prefix and stored as `{"data", "timestamp", "expiresAt"}`.
//! Nothing here returns an error: store failures are logged and degrade to no-ops,
//! `None` or `false`. Without a store every operation is a no-op.

use crate::domain::{CacheRecord, CacheRecordHeader};
use crate::ports::KeyValueStore;
use crate::shared::{Clock, SystemClock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

const MINUTE_MS: i64 = 60_000;

/// Absolute expiry for a TTL; clamps at `i64::MAX` instead of wrapping.
fn expiry(now_ms: i64, ttl_minutes: u64) -> i64 {
    let ttl_ms = i64::try_from(ttl_minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(MINUTE_MS);
    now_ms.saturating_add(ttl_ms)
}

pub struct PersistentCache {
    store: Option<Arc<dyn KeyValueStore>>,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl PersistentCache {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            prefix: prefix.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Cache with no backing store (e.g. no persistent storage in this context).
    pub fn disabled() -> Self {
        Self {
            store: None,
            prefix: String::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Store `payload` under `key`. `ttl_minutes = None` never expires; `Some(0)` is already stale.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        payload: &T,
        ttl_minutes: Option<u64>,
    ) {
        let Some(store) = &self.store else { return };
        let now = self.clock.now_ms();
        let record = CacheRecord {
            data: payload,
            timestamp: now,
            expires_at: ttl_minutes.map(|m| expiry(now, m)),
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "cache payload not serializable; skipped");
                return;
            }
        };
        if let Err(e) = store.set_item(&self.namespaced(key), &json).await {
            warn!(key, error = %e, "cache write failed; skipped");
        }
    }

    /// Fresh payload for `key`, or `None` when absent, malformed or expired.
    /// An expired entry is deleted before returning.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_fresh(key).await?;
        match serde_json::from_str::<CacheRecord<T>>(&raw) {
            Ok(record) => Some(record.data),
            Err(e) => {
                debug!(key, error = %e, "cache entry does not match requested type");
                None
            }
        }
    }

    /// Same expiry rules as [`get`](Self::get) without decoding the payload.
    pub async fn has(&self, key: &str) -> bool {
        self.read_fresh(key).await.is_some()
    }

    pub async fn remove(&self, key: &str) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store.remove_item(&self.namespaced(key)).await {
            warn!(key, error = %e, "cache remove failed");
        }
    }

    /// Remove every entry under this cache's prefix. Other keys in the store are untouched.
    pub async fn clear(&self) {
        for full_key in self.own_keys().await {
            self.remove_full(&full_key).await;
        }
    }

    /// Sweep expired entries under the prefix. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let Some(store) = &self.store else { return 0 };
        let now = self.clock.now_ms();
        let mut removed = 0;
        for full_key in self.own_keys().await {
            let expired = match store.get_item(&full_key).await {
                Ok(Some(raw)) => serde_json::from_str::<CacheRecordHeader>(&raw)
                    .map(|h| h.is_expired(now))
                    .unwrap_or(false),
                _ => false,
            };
            if expired {
                self.remove_full(&full_key).await;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, prefix = %self.prefix, "expired cache entries swept");
        }
        removed
    }

    /// Raw record for `key` if present, well-formed and unexpired.
    async fn read_fresh(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        let full_key = self.namespaced(key);
        let raw = match store.get_item(&full_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
        };
        let header = match serde_json::from_str::<CacheRecordHeader>(&raw) {
            Ok(header) => header,
            Err(e) => {
                debug!(key, error = %e, "malformed cache entry");
                return None;
            }
        };
        if header.is_expired(self.clock.now_ms()) {
            debug!(key, "cache entry expired; deleting");
            self.remove_full(&full_key).await;
            return None;
        }
        Some(raw)
    }

    async fn own_keys(&self) -> Vec<String> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.keys().await {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.prefix))
                .collect(),
            Err(e) => {
                warn!(error = %e, "cache key listing failed");
                Vec::new()
            }
        }
    }

    async fn remove_full(&self, full_key: &str) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store.remove_item(full_key).await {
            warn!(key = full_key, error = %e, "cache remove failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStore;
    use crate::shared::ManualClock;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
    }

    fn cache_with(store: Arc<MemoryStore>) -> (PersistentCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = PersistentCache::new(store, "test_").with_clock(clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_zero_ttl_is_immediately_stale() {
        let (cache, _clock) = cache_with(Arc::new(MemoryStore::new()));
        cache.save("k", &json!(1), Some(0)).await;
        assert_eq!(cache.get::<i32>("k").await, None);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let (cache, clock) = cache_with(Arc::new(MemoryStore::new()));
        cache.save("k", "v", None).await;
        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));
        assert!(cache.has("k").await);
    }

    #[tokio::test]
    async fn test_huge_ttl_saturates_instead_of_expiring() {
        let (cache, clock) = cache_with(Arc::new(MemoryStore::new()));
        cache.save("k", &json!(1), Some(u64::MAX)).await;
        cache.save("j", &json!(2), Some(i64::MAX as u64 / 1000)).await;
        clock.advance(Duration::from_secs(100 * 365 * 24 * 3600));
        assert_eq!(cache.get::<i32>("k").await, Some(1));
        assert_eq!(cache.get::<i32>("j").await, Some(2));
        assert_eq!(expiry(1_000, u64::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_expired_read_deletes_entry() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = cache_with(store.clone());
        let profile = Profile { name: "A".into() };

        cache.save("profile", &profile, Some(60)).await;
        clock.advance(Duration::from_secs(59 * 60));
        assert_eq!(cache.get::<Profile>("profile").await, Some(profile));

        clock.advance(Duration::from_secs(2 * 60));
        assert_eq!(cache.get::<Profile>("profile").await, None);
        assert!(!cache.has("profile").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_stored_layout() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _clock) = cache_with(store.clone());
        cache.save("k", &json!({"a": 1}), Some(1)).await;

        let raw = store.get_item("test_k").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"]["a"], 1);
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
        assert_eq!(value["expiresAt"], 1_700_000_060_000i64);
    }

    #[tokio::test]
    async fn test_malformed_entry_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set_item("test_bad", "{oops").await.unwrap();
        let (cache, _clock) = cache_with(store);
        assert_eq!(cache.get::<String>("bad").await, None);
        assert!(!cache.has("bad").await);
    }

    #[tokio::test]
    async fn test_clear_only_touches_namespace() {
        let store = Arc::new(MemoryStore::new());
        store.set_item("session_token", "abc").await.unwrap();
        let (cache, _clock) = cache_with(store.clone());
        cache.save("a", &1, None).await;
        cache.save("b", &2, None).await;

        cache.clear().await;
        assert_eq!(store.keys().await.unwrap(), vec!["session_token"]);
    }

    #[tokio::test]
    async fn test_quota_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::with_quota(8));
        let (cache, _clock) = cache_with(store.clone());
        cache.save("big", &"x".repeat(100), None).await;
        assert!(!cache.has("big").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let cache = PersistentCache::disabled();
        cache.save("k", &1, None).await;
        assert_eq!(cache.get::<i32>("k").await, None);
        assert!(!cache.has("k").await);
        cache.remove("k").await;
        cache.clear().await;
        assert_eq!(cache.cleanup_expired().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sweeps() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = cache_with(store.clone());
        cache.save("short", &1, Some(1)).await;
        cache.save("long", &2, Some(120)).await;
        cache.save("forever", &3, None).await;

        clock.advance(Duration::from_secs(5 * 60));
        assert_eq!(cache.cleanup_expired().await, 1);
        assert_eq!(store.len(), 2);
    }
}
