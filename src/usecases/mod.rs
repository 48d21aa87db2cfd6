//! Application use cases. Orchestrate domain logic via ports.

pub mod connectivity;
pub mod error_reporter;
pub mod offline_reader;
pub mod query_policy;
pub mod recovery;
pub mod request_executor;
pub mod ttl_cache;

pub use connectivity::{ConnectivityCallbacks, ConnectivityMonitor, Subscription};
pub use error_reporter::{ErrorReporter, LogOptions, ReporterStats, Route};
pub use offline_reader::{Fetched, OfflineReader, Source};
pub use query_policy::{Operation, QueryExecutor, QueryPolicy};
pub use recovery::{
    BoundaryState, FallbackRenderer, FallbackView, RecoveryAction, RecoveryBoundary, Rendered,
};
pub use request_executor::{RequestConfig, ResilientExecutor};
pub use ttl_cache::PersistentCache;
