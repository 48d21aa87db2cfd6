//! Port errors. Returned by adapters behind the outbound ports.
//!
//! Adapters map infrastructure errors into these; use cases classify them into
//! an [`ErrorRecord`](crate::domain::ErrorRecord) before they leave the core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request never produced a response (DNS, connect, reset, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The in-flight call observed its cancellation token and stopped waiting.
    #[error("Request aborted")]
    Aborted,

    #[error("Store error: {0}")]
    Store(String),

    /// The store refused the write because it is full.
    #[error("Store quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Telemetry delivery failed: {0}")]
    Telemetry(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
