//! Offline-aware reads.
//!
//! Online: fetch through the read policy and refresh the cache. Offline, or when the
//! fetch fails with a connectivity failure (`Network`/`Timeout`): serve the cached copy
//! while it is fresh.

use crate::domain::{ErrorKind, ErrorRecord, HttpRequest};
use crate::usecases::connectivity::{ConnectivityCallbacks, ConnectivityMonitor, Subscription};
use crate::usecases::error_reporter::LogOptions;
use crate::usecases::query_policy::QueryExecutor;
use crate::usecases::request_executor::ResilientExecutor;
use crate::usecases::ttl_cache::PersistentCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_TTL_MINUTES: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: Source,
}

pub struct OfflineReader {
    executor: Arc<ResilientExecutor>,
    queries: Arc<QueryExecutor>,
    cache: Arc<PersistentCache>,
    connectivity: ConnectivityMonitor,
    /// Keeps the monitor tracking the platform signal for as long as the reader lives.
    _subscription: Subscription,
    ttl_minutes: Option<u64>,
}

impl OfflineReader {
    pub fn new(
        executor: Arc<ResilientExecutor>,
        queries: Arc<QueryExecutor>,
        cache: Arc<PersistentCache>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let _subscription =
            connectivity.subscribe(ConnectivityCallbacks::new().notifications(false));
        Self {
            executor,
            queries,
            cache,
            connectivity,
            _subscription,
            ttl_minutes: Some(DEFAULT_TTL_MINUTES),
        }
    }

    /// TTL applied to refreshed entries. `None` keeps them until overwritten.
    pub fn with_ttl_minutes(mut self, ttl_minutes: Option<u64>) -> Self {
        self.ttl_minutes = ttl_minutes;
        self
    }

    pub async fn read<T>(
        &self,
        key: &str,
        request: &HttpRequest,
    ) -> Result<Fetched<T>, ErrorRecord>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.connectivity.is_offline() {
            return match self.cache.get::<T>(key).await {
                Some(value) => {
                    debug!(key, "offline; served from cache");
                    Ok(Fetched {
                        value,
                        source: Source::Cache,
                    })
                }
                None => {
                    let err = ErrorRecord::network("No network connection and no cached copy")
                        .with_context("url", request.url.as_str())
                        .with_context("cache_key", key)
                        .with_context("offline", true);
                    self.queries
                        .reporter()
                        .warn(err.clone(), LogOptions::new().tag("offline"));
                    Err(err)
                }
            };
        }

        // The read policy owns retries here; the executor keeps its timeout only.
        let config = self.executor.defaults().clone().retries(0);
        let fetched = self
            .queries
            .read(key, || async {
                self.executor
                    .fetch_json::<T>(request, &config)
                    .await
                    .and_then(|value| {
                        value.ok_or_else(|| {
                            ErrorRecord::data("Empty response body")
                                .with_context("url", request.url.as_str())
                        })
                    })
            })
            .await;

        match fetched {
            Ok(value) => {
                self.cache.save(key, &value, self.ttl_minutes).await;
                Ok(Fetched {
                    value,
                    source: Source::Network,
                })
            }
            Err(err) if matches!(err.kind, ErrorKind::Network | ErrorKind::Timeout) => {
                match self.cache.get::<T>(key).await {
                    Some(value) => {
                        warn!(key, kind = %err.kind, "fetch failed; served cached copy");
                        Ok(Fetched {
                            value,
                            source: Source::Cache,
                        })
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }
}
