//! Cross-cutting configuration and time source.

pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, Environment};
