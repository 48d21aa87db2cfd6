//! Infrastructure adapters. Implement outbound ports.
//!
//! HTTP, key/value storage, telemetry, platform signals, toasts. Map errors to DomainError.

pub mod http;
pub mod platform;
pub mod storage;
pub mod telemetry;
pub mod ui;
