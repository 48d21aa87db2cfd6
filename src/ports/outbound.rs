//! Outbound ports. The core calls into infrastructure through these.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, HttpRequest, HttpResponse, LogEnvelope};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// HTTP primitive. Must stop waiting and return `DomainError::Aborted` once `cancel` fires.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request. Non-2xx statuses are returned as `Ok`; only a missing response is `Err`.
    async fn send(
        &self,
        request: &HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, DomainError>;
}

/// String key/value store (the browser's local storage, a JSON file, memory).
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// A single write is atomic from the caller's perspective.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError>;

    async fn remove_item(&self, key: &str) -> Result<(), DomainError>;

    /// All keys currently in the store, across every namespace.
    async fn keys(&self) -> Result<Vec<String>, DomainError>;
}

/// External telemetry destination used in production.
pub trait TelemetryPort: Send + Sync {
    /// Hand the envelope off for delivery. Must not block on the network.
    fn deliver(&self, envelope: &LogEnvelope) -> Result<(), DomainError>;
}

/// Callback invoked with `true` when the platform goes online, `false` when offline.
pub type ReachabilityListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Opaque handle for a registered platform listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The platform's online/offline signal.
pub trait ReachabilityPort: Send + Sync {
    /// Current reachability as reported by the platform.
    fn is_online(&self) -> bool;

    fn attach(&self, listener: ReachabilityListener) -> ListenerId;

    fn detach(&self, id: ListenerId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityNotice {
    WentOffline,
    BackOnline,
}

/// Transient user-facing notification (toast).
pub trait NotifierPort: Send + Sync {
    fn notify(&self, notice: ConnectivityNotice);
}
