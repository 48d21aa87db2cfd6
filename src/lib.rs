//! realty-resilience: resilient data-access core for the realty web client.
//!
//! Error taxonomy, request executor, connectivity monitor, TTL cache, error reporting
//! and recovery boundary, laid out hexagonally: domain, ports, adapters, use cases.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
