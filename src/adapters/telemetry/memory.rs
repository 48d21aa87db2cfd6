//! In-memory telemetry destination. Keeps delivered envelopes for inspection.

use crate::domain::{DomainError, LogEnvelope};
use crate::ports::TelemetryPort;
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    envelopes: Mutex<Vec<LogEnvelope>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<LogEnvelope> {
        self.envelopes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.envelopes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.lock().is_empty()
    }
}

impl TelemetryPort for MemoryTelemetry {
    fn deliver(&self, envelope: &LogEnvelope) -> Result<(), DomainError> {
        self.envelopes.lock().push(envelope.clone());
        Ok(())
    }
}
