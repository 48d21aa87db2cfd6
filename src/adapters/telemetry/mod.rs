//! Telemetry destinations. Implement TelemetryPort.

pub mod http_telemetry;
pub mod memory;

pub use http_telemetry::HttpTelemetry;
pub use memory::MemoryTelemetry;
