//! Resilient request executor. One logical call: timeout, cooperative cancellation,
//! fixed-delay retry of transient failures.
//!
//! Each attempt runs under its own cancellation token (a child of the caller's, when
//! given). A deadline armed at the start of the attempt fires the token; the deadline
//! lives inside the attempt, so settling the attempt disarms it. Attempts never overlap.
//!
//! The executor classifies but does not report; reporting belongs to the callers.

use crate::domain::{
    Cause, DomainError, ErrorRecord, HttpRequest, HttpResponse, Payload, ResponseBody,
};
use crate::ports::HttpTransport;
use crate::shared::AppConfig;
use crate::shared::config::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS};
use crate::usecases::connectivity::{ConnectivityCallbacks, ConnectivityMonitor, Subscription};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout: Duration,
    /// Additional attempts after the first failure.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Fail fast with a `Network` error while the monitor reports offline.
    pub requires_network: bool,
    /// Caller-owned token; firing it stops the call without retrying.
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            requires_network: false,
            cancel: None,
        }
    }
}

impl RequestConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            timeout: cfg.request_timeout(),
            retries: cfg.request_retries_or_default(),
            retry_delay: cfg.retry_delay(),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn require_network(mut self) -> Self {
        self.requires_network = true;
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn caller_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

enum Outcome {
    Response(HttpResponse),
    Transport(DomainError),
    TimedOut,
    Cancelled,
}

pub struct ResilientExecutor {
    transport: Arc<dyn HttpTransport>,
    /// The subscription keeps the monitor tracking the platform signal.
    connectivity: Option<(ConnectivityMonitor, Subscription)>,
    defaults: RequestConfig,
}

impl ResilientExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            connectivity: None,
            defaults: RequestConfig::default(),
        }
    }

    pub fn with_connectivity(mut self, monitor: ConnectivityMonitor) -> Self {
        let subscription = monitor.subscribe(ConnectivityCallbacks::new().notifications(false));
        self.connectivity = Some((monitor, subscription));
        self
    }

    pub fn with_defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    pub async fn execute(&self, request: &HttpRequest) -> Result<Payload, ErrorRecord> {
        self.execute_with(request, &self.defaults).await
    }

    /// Run the call, retrying `Network`/`Timeout`/`ServerError` failures up to
    /// `config.retries` times.
    pub async fn execute_with(
        &self,
        request: &HttpRequest,
        config: &RequestConfig,
    ) -> Result<Payload, ErrorRecord> {
        let offline = self
            .connectivity
            .as_ref()
            .is_some_and(|(monitor, _)| monitor.is_offline());
        if config.requires_network && offline {
            return Err(ErrorRecord::network("No network connection")
                .with_context("url", request.url.as_str())
                .with_context("offline", true));
        }

        let mut remaining = config.retries;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self.attempt(request, config).await {
                Ok(payload) => return Ok(payload),
                Err(err) => err,
            };

            if remaining == 0 || config.caller_cancelled() || !err.is_retryable() {
                return Err(err.with_context("attempts", attempt));
            }
            remaining -= 1;
            debug!(
                url = %request.url,
                kind = %err.kind,
                attempt,
                remaining,
                delay_ms = config.retry_delay.as_millis() as u64,
                "retrying request"
            );

            match &config.cancel {
                Some(cancel) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(cancelled_error(request).with_context("attempts", attempt));
                        }
                        _ = tokio::time::sleep(config.retry_delay) => {}
                    }
                }
                None => tokio::time::sleep(config.retry_delay).await,
            }
        }
    }

    /// Execute and decode the payload into `T`. `None` for an empty body.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: &HttpRequest,
        config: &RequestConfig,
    ) -> Result<Option<T>, ErrorRecord> {
        let payload = self.execute_with(request, config).await?;
        payload
            .into_typed()
            .map_err(|e| e.with_context("url", request.url.as_str()))
    }

    async fn attempt(
        &self,
        request: &HttpRequest,
        config: &RequestConfig,
    ) -> Result<Payload, ErrorRecord> {
        let token = match &config.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let deadline = tokio::time::sleep(config.timeout);
        tokio::pin!(deadline);
        let send = self.transport.send(request, token.clone());
        tokio::pin!(send);

        let outcome = tokio::select! {
            biased;
            res = &mut send => match res {
                Ok(response) => Outcome::Response(response),
                Err(DomainError::Aborted) if config.caller_cancelled() => Outcome::Cancelled,
                Err(e) => Outcome::Transport(e),
            },
            // Only the caller can fire the token before the deadline does.
            _ = token.cancelled() => Outcome::Cancelled,
            _ = &mut deadline => {
                token.cancel();
                Outcome::TimedOut
            }
        };

        match outcome {
            Outcome::Response(response) => decode(request, response),
            Outcome::TimedOut => Err(ErrorRecord::timeout(format!(
                "No response within {} ms",
                config.timeout.as_millis()
            ))
            .with_context("url", request.url.as_str())
            .with_context("timeout_ms", config.timeout.as_millis() as u64)),
            Outcome::Cancelled => Err(cancelled_error(request)),
            Outcome::Transport(e) => Err(ErrorRecord::network(e.to_string())
                .with_context("url", request.url.as_str())
                .with_context("method", request.method.as_str())
                .with_cause(Cause::Exception(Arc::new(e)))),
        }
    }
}

fn cancelled_error(request: &HttpRequest) -> ErrorRecord {
    ErrorRecord::network("Request cancelled")
        .with_context("url", request.url.as_str())
        .with_context("cancelled", true)
}

fn decode(request: &HttpRequest, response: HttpResponse) -> Result<Payload, ErrorRecord> {
    if response.is_success() {
        return Ok(success_payload(response));
    }
    let body = failure_body(&response);
    Err(
        ErrorRecord::from_response(response.status, &response.status_text, &body)
            .with_context("url", request.url.as_str())
            .with_context("method", request.method.as_str()),
    )
}

fn success_payload(response: HttpResponse) -> Payload {
    if response.status == 204 || response.body.is_empty() {
        return Payload::Empty;
    }
    if response.is_json() {
        return match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                debug!(error = %e, "json body did not parse; returning text");
                Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
            }
        };
    }
    if response.is_text() || response.content_type.is_none() {
        return match String::from_utf8(response.body) {
            Ok(text) => Payload::Text(text),
            Err(e) => Payload::Binary(e.into_bytes()),
        };
    }
    Payload::Binary(response.body)
}

/// Structured body, else raw text, else nothing. Status text is applied by the record builder.
fn failure_body(response: &HttpResponse) -> ResponseBody {
    if response.body.is_empty() {
        return ResponseBody::Empty;
    }
    if let Ok(value) = serde_json::from_slice::<Value>(&response.body) {
        if value.is_object() {
            return ResponseBody::Json(value);
        }
    }
    let text = String::from_utf8_lossy(&response.body);
    if text.trim().is_empty() {
        ResponseBody::Empty
    } else {
        ResponseBody::Text(text.into_owned())
    }
}
