//! Telemetry destination that POSTs envelopes as JSON to a collector endpoint.

use crate::domain::{DomainError, LogEnvelope};
use crate::ports::TelemetryPort;
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::warn;

/// Fire-and-forget HTTP telemetry. Delivery runs on the current tokio runtime.
pub struct HttpTelemetry {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTelemetry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl TelemetryPort for HttpTelemetry {
    fn deliver(&self, envelope: &LogEnvelope) -> Result<(), DomainError> {
        let handle = Handle::try_current()
            .map_err(|_| DomainError::Telemetry("no async runtime for delivery".into()))?;
        let body =
            serde_json::to_value(envelope).map_err(|e| DomainError::Telemetry(e.to_string()))?;

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        let endpoint = self.endpoint.clone();

        handle.spawn(async move {
            match request.send().await {
                Ok(res) if !res.status().is_success() => {
                    warn!(
                        endpoint = %endpoint,
                        status = %res.status(),
                        "telemetry endpoint rejected envelope"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(endpoint = %endpoint, error = %e, "telemetry delivery failed"),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorRecord, LogLevel};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn envelope() -> LogEnvelope {
        LogEnvelope {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            tags: vec!["query".into()],
            user: None,
            extras: BTreeMap::new(),
            error: ErrorRecord::network("down"),
        }
    }

    #[test]
    fn test_deliver_without_runtime_fails() {
        let telemetry = HttpTelemetry::new("http://127.0.0.1:9/ingest");
        let err = telemetry.deliver(&envelope()).unwrap_err();
        assert!(matches!(err, DomainError::Telemetry(_)));
    }
}
