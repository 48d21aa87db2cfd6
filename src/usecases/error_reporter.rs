//! Error reporting sink. The single funnel every surfaced failure passes through.
//!
//! Development: envelopes go to the developer console (the tracing subscriber) with
//! context, cause chain and backtrace. Production: envelopes go to the telemetry
//! destination; without one, or when it refuses, they fall back to a terse console line.

use crate::domain::{ErrorRecord, LogEnvelope, LogLevel, LogUser, RawFailure, classify};
use crate::ports::TelemetryPort;
use crate::shared::{Clock, Environment, SystemClock};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! emit {
    ($level:expr, $($rest:tt)*) => {
        match $level {
            LogLevel::Debug => tracing::debug!($($rest)*),
            LogLevel::Info => tracing::info!($($rest)*),
            LogLevel::Warn => tracing::warn!($($rest)*),
            LogLevel::Error => tracing::error!($($rest)*),
        }
    };
}

/// Per-call options merged into the envelope.
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub level: LogLevel,
    pub tags: Vec<String>,
    pub user: Option<LogUser>,
    pub extras: BTreeMap<String, Value>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LogLevel::Error,
            tags: Vec::new(),
            user: None,
            extras: BTreeMap::new(),
        }
    }
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn user(mut self, user: LogUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// Where envelopes are routed for this reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Full detail to the developer console.
    DevConsole,
    Telemetry,
    /// Production without a destination: summary line on the console.
    ProdConsole,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReporterStats {
    pub logged: u64,
    pub console_writes: u64,
    pub telemetry_deliveries: u64,
    pub telemetry_failures: u64,
}

#[derive(Default)]
struct Counters {
    logged: AtomicU64,
    console_writes: AtomicU64,
    telemetry_deliveries: AtomicU64,
    telemetry_failures: AtomicU64,
}

/// Process-wide sink. Build one at the composition root and share it via `Arc`.
pub struct ErrorReporter {
    environment: Environment,
    telemetry: Option<Arc<dyn TelemetryPort>>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl ErrorReporter {
    pub fn new(environment: Environment, telemetry: Option<Arc<dyn TelemetryPort>>) -> Self {
        Self {
            environment,
            telemetry,
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn route(&self) -> Route {
        match (self.environment, &self.telemetry) {
            (Environment::Development, _) => Route::DevConsole,
            (Environment::Production, Some(_)) => Route::Telemetry,
            (Environment::Production, None) => Route::ProdConsole,
        }
    }

    /// Classify (if needed), build the envelope, deliver it, and hand it back.
    pub fn log(&self, failure: impl Into<RawFailure>, options: LogOptions) -> LogEnvelope {
        let envelope = LogEnvelope {
            timestamp: self.clock.now(),
            level: options.level,
            tags: options.tags,
            user: options.user,
            extras: options.extras,
            error: classify(failure),
        };
        self.counters.logged.fetch_add(1, Ordering::Relaxed);
        self.deliver(&envelope);
        envelope
    }

    pub fn debug(&self, failure: impl Into<RawFailure>, options: LogOptions) -> LogEnvelope {
        self.log(failure, LogOptions { level: LogLevel::Debug, ..options })
    }

    pub fn info(&self, failure: impl Into<RawFailure>, options: LogOptions) -> LogEnvelope {
        self.log(failure, LogOptions { level: LogLevel::Info, ..options })
    }

    pub fn warn(&self, failure: impl Into<RawFailure>, options: LogOptions) -> LogEnvelope {
        self.log(failure, LogOptions { level: LogLevel::Warn, ..options })
    }

    pub fn error(&self, failure: impl Into<RawFailure>, options: LogOptions) -> LogEnvelope {
        self.log(failure, LogOptions { level: LogLevel::Error, ..options })
    }

    pub fn stats(&self) -> ReporterStats {
        ReporterStats {
            logged: self.counters.logged.load(Ordering::Relaxed),
            console_writes: self.counters.console_writes.load(Ordering::Relaxed),
            telemetry_deliveries: self.counters.telemetry_deliveries.load(Ordering::Relaxed),
            telemetry_failures: self.counters.telemetry_failures.load(Ordering::Relaxed),
        }
    }

    fn deliver(&self, envelope: &LogEnvelope) {
        match (self.route(), &self.telemetry) {
            (Route::Telemetry, Some(telemetry)) => match telemetry.deliver(envelope) {
                Ok(()) => {
                    self.counters
                        .telemetry_deliveries
                        .fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters
                        .telemetry_failures
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        error = %e,
                        "telemetry unavailable; writing envelope to console"
                    );
                    self.write_console(envelope, false);
                }
            },
            (Route::DevConsole, _) => self.write_console(envelope, true),
            _ => self.write_console(envelope, false),
        }
    }

    fn write_console(&self, envelope: &LogEnvelope, detailed: bool) {
        self.counters.console_writes.fetch_add(1, Ordering::Relaxed);
        let record = &envelope.error;
        let tags = envelope.tags.join(",");
        let user = envelope.user.as_ref().map_or("-", |u| u.id.as_str());
        let status = record.http_status.map(i64::from).unwrap_or(-1);

        if !detailed {
            emit!(
                envelope.level,
                kind = %record.kind,
                status,
                tags = %tags,
                user,
                "{}",
                record.message
            );
            return;
        }

        let context = serde_json::to_string(&record.context).unwrap_or_default();
        let extras = serde_json::to_string(&envelope.extras).unwrap_or_default();
        let causes = record.cause_chain().join(" <- ");
        let fields = if record.field_errors.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&record.field_errors).unwrap_or_default()
        };
        let backtrace = Backtrace::capture();
        emit!(
            envelope.level,
            kind = %record.kind,
            status,
            tags = %tags,
            user,
            context = %context,
            extras = %extras,
            fields = %fields,
            causes = %causes,
            backtrace = %backtrace,
            "{}",
            record.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cause, DomainError, ErrorKind};
    use crate::adapters::telemetry::MemoryTelemetry;
    use crate::shared::ManualClock;

    struct RefusingTelemetry;

    impl TelemetryPort for RefusingTelemetry {
        fn deliver(&self, _envelope: &LogEnvelope) -> Result<(), DomainError> {
            Err(DomainError::Telemetry("collector down".into()))
        }
    }

    #[test]
    fn test_envelope_merges_options() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let reporter = ErrorReporter::new(Environment::Development, None).with_clock(clock);
        let envelope = reporter.warn(
            "boom",
            LogOptions::new()
                .tag("listings")
                .user(LogUser {
                    id: "agent-7".into(),
                    email: None,
                })
                .extra("page", 2),
        );
        assert_eq!(envelope.level, LogLevel::Warn);
        assert_eq!(envelope.tags, vec!["listings"]);
        assert_eq!(envelope.user.as_ref().unwrap().id, "agent-7");
        assert_eq!(envelope.extras["page"], 2);
        assert_eq!(envelope.error.kind, ErrorKind::Unknown);
        assert_eq!(envelope.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_log_does_not_rewrap_records() {
        let reporter = ErrorReporter::new(Environment::Development, None);
        let record = ErrorRecord::timeout("slow").with_cause(Cause::Opaque("timer".into()));
        let envelope = reporter.error(record.clone(), LogOptions::new());
        assert_eq!(envelope.error, record);
    }

    #[test]
    fn test_development_writes_console_even_with_telemetry() {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let reporter = ErrorReporter::new(Environment::Development, Some(telemetry.clone()));
        reporter.error(ErrorRecord::network("down"), LogOptions::new());
        assert_eq!(reporter.route(), Route::DevConsole);
        assert!(telemetry.is_empty());
        assert_eq!(reporter.stats().console_writes, 1);
    }

    #[test]
    fn test_production_routes_to_telemetry() {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let reporter = ErrorReporter::new(Environment::Production, Some(telemetry.clone()));
        reporter.error(ErrorRecord::network("down"), LogOptions::new().tag("query"));
        let delivered = telemetry.envelopes();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].tags, vec!["query"]);
        assert_eq!(reporter.stats().console_writes, 0);
    }

    #[test]
    fn test_production_without_destination_uses_console() {
        let reporter = ErrorReporter::new(Environment::Production, None);
        reporter.info("note", LogOptions::new());
        assert_eq!(reporter.route(), Route::ProdConsole);
        assert_eq!(reporter.stats().console_writes, 1);
    }

    #[test]
    fn test_refused_telemetry_falls_back_to_console() {
        let reporter =
            ErrorReporter::new(Environment::Production, Some(Arc::new(RefusingTelemetry)));
        reporter.error("lost?", LogOptions::new());
        let stats = reporter.stats();
        assert_eq!(stats.telemetry_failures, 1);
        assert_eq!(stats.console_writes, 1);
        assert_eq!(stats.logged, 1);
    }

    #[test]
    fn test_cause_chain_walks_sources() {
        let inner = ErrorRecord::network("socket closed");
        let outer = ErrorRecord::unknown("fetch failed").with_cause(Cause::Record(Box::new(inner)));
        assert_eq!(outer.cause_chain(), vec!["network: socket closed"]);
    }
}
