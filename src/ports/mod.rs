//! Port traits. API boundaries for the hexagon.
//!
//! Outbound only: the core calls into transport, storage, telemetry and the platform.

pub mod outbound;

pub use outbound::{
    ConnectivityNotice, HttpTransport, KeyValueStore, ListenerId, NotifierPort,
    ReachabilityListener, ReachabilityPort, TelemetryPort,
};
