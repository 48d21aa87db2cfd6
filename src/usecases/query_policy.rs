//! Query executor policy. Differentiated retry for reads and writes.
//!
//! Reads retry with exponential backoff (`base * 2^n`, capped) unless the failure
//! carries a 4xx status. Writes do not retry by default. A failure that survives the
//! policy is reported once, tagged with its operation type.

use crate::domain::{ErrorRecord, RawFailure, classify};
use crate::shared::AppConfig;
use crate::shared::config::{
    DEFAULT_QUERY_BASE_DELAY_MS, DEFAULT_QUERY_MAX_DELAY_MS, DEFAULT_QUERY_READ_RETRIES,
};
use crate::usecases::error_reporter::{ErrorReporter, LogOptions};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn tag(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    pub read_retries: u32,
    /// Zero unless the caller knows its writes are idempotent.
    pub write_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            read_retries: DEFAULT_QUERY_READ_RETRIES,
            write_retries: 0,
            base_delay: Duration::from_millis(DEFAULT_QUERY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_QUERY_MAX_DELAY_MS),
        }
    }
}

impl QueryPolicy {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            read_retries: cfg.query_read_retries_or_default(),
            base_delay: cfg.query_base_delay(),
            max_delay: cfg.query_max_delay(),
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay)
    }

    fn retry_budget(&self, operation: Operation) -> u32 {
        match operation {
            Operation::Read => self.read_retries,
            Operation::Write => self.write_retries,
        }
    }

    /// Whether a failure seen after `retries_done` retries should be retried.
    pub fn should_retry(&self, operation: Operation, retries_done: u32, err: &ErrorRecord) -> bool {
        retries_done < self.retry_budget(operation) && !err.is_client_error()
    }
}

pub struct QueryExecutor {
    reporter: Arc<ErrorReporter>,
    policy: QueryPolicy,
}

impl QueryExecutor {
    pub fn new(reporter: Arc<ErrorReporter>, policy: QueryPolicy) -> Self {
        Self { reporter, policy }
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub async fn read<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, ErrorRecord>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(Operation::Read, label, op).await
    }

    pub async fn write<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, ErrorRecord>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(Operation::Write, label, op).await
    }

    pub async fn run<T, E, F, Fut>(
        &self,
        operation: Operation,
        label: &str,
        mut op: F,
    ) -> Result<T, ErrorRecord>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        let mut retries_done = 0u32;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => classify(e),
            };

            if !self.policy.should_retry(operation, retries_done, &err) {
                self.reporter.error(
                    err.clone(),
                    LogOptions::new()
                        .tag(operation.tag())
                        .extra("operation", label)
                        .extra("attempts", retries_done + 1),
                );
                return Err(err);
            }

            let delay = self.policy.backoff(retries_done);
            debug!(
                op = operation.tag(),
                label,
                kind = %err.kind,
                retry = retries_done + 1,
                delay_ms = delay.as_millis() as u64,
                "query retry scheduled"
            );
            tokio::time::sleep(delay).await;
            retries_done += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::telemetry::MemoryTelemetry;
    use crate::domain::ErrorKind;
    use crate::shared::Environment;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn executor() -> (QueryExecutor, Arc<MemoryTelemetry>) {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let reporter = Arc::new(ErrorReporter::new(
            Environment::Production,
            Some(telemetry.clone()),
        ));
        (QueryExecutor::new(reporter, QueryPolicy::default()), telemetry)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = QueryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
        assert_eq!(policy.backoff(40), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_retries_with_backoff_then_reports() {
        let (exec, telemetry) = executor();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = exec
            .read("listings", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ErrorRecord::from_status(500, "boom"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ServerError);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_secs(7));

        let envelopes = telemetry.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].tags, vec!["read"]);
        assert_eq!(envelopes[0].extras["attempts"], 4);
        assert_eq!(envelopes[0].extras["operation"], "listings");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_client_error_not_retried() {
        let (exec, telemetry) = executor();
        let calls = AtomicU32::new(0);

        let err = exec
            .read("listing", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ErrorRecord::from_status(404, "gone"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(telemetry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_recovers_without_reporting() {
        let (exec, telemetry) = executor();
        let calls = AtomicU32::new(0);

        let value = exec
            .read("dashboard", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ErrorRecord::network("flaky"))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(telemetry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_never_retries_by_default() {
        let (exec, telemetry) = executor();
        let calls = AtomicU32::new(0);

        let err = exec
            .write("create-request", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ErrorRecord::network("reset"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(telemetry.envelopes()[0].tags, vec!["write"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_failures_are_classified() {
        let (exec, _telemetry) = executor();
        let err = exec
            .write("upload", || async { Err::<(), _>("disk full") })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "disk full");
    }
}
