//! Platform signal adapters. Implement ReachabilityPort.

pub mod manual_reachability;

pub use manual_reachability::ManualReachability;
