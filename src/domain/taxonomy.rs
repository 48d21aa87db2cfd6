//! Error taxonomy. Every failure that crosses a component boundary is an [`ErrorRecord`].
//!
//! Records are built either through the per-kind constructors or through [`classify`],
//! which turns any [`RawFailure`] into a record. Classification is idempotent: a
//! record passed to `classify` comes back untouched.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::DomainError;

/// Closed set of failure kinds. Control flow branches on this, never on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    Api,
    NotFound,
    Unauthorized,
    Forbidden,
    ServerError,
    Auth,
    SessionExpired,
    Validation,
    Data,
    ExternalService,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::Api,
        ErrorKind::NotFound,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::ServerError,
        ErrorKind::Auth,
        ErrorKind::SessionExpired,
        ErrorKind::Validation,
        ErrorKind::Data,
        ErrorKind::ExternalService,
        ErrorKind::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Api => "api",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Auth => "auth",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::Validation => "validation",
            ErrorKind::Data => "data",
            ErrorKind::ExternalService => "external_service",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Developer-facing default message used when a constructor gets no text.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Network => "Network connection failed",
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::Api => "Request failed",
            ErrorKind::NotFound => "Requested resource was not found",
            ErrorKind::Unauthorized => "Not authorized",
            ErrorKind::Forbidden => "Access forbidden",
            ErrorKind::ServerError => "Server error",
            ErrorKind::Auth => "Authentication failed",
            ErrorKind::SessionExpired => "Session expired",
            ErrorKind::Validation => "Invalid input",
            ErrorKind::Data => "Unexpected data",
            ErrorKind::ExternalService => "External service failed",
            ErrorKind::Unknown => "Unexpected error",
        }
    }

    /// Kinds the resilient executor may retry: transient transport trouble and 5xx.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::ServerError
        )
    }

    /// Maps a transport status to its kind. 2xx/3xx never reach here in practice and land in `Api`.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::Api,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages, in the order fields were first inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to `field`, creating the field entry at the end if new.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.0.push((field, vec![message])),
        }
    }

    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(field, message);
        self
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|(_, messages)| messages.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    /// Reads `{"field": ["msg", ...], "other": "msg"}`. Non-string entries are skipped.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut out = FieldErrors::new();
        for (field, messages) in object {
            match messages {
                Value::String(s) => out.push(field.clone(), s.clone()),
                Value::Array(items) => {
                    for item in items.iter().filter_map(Value::as_str) {
                        out.push(field.clone(), item);
                    }
                }
                _ => {}
            }
        }
        (!out.is_empty()).then_some(out)
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// The underlying failure behind a record. Kept for traceability, never unwrapped automatically.
#[derive(Debug, Clone, Error)]
pub enum Cause {
    #[error(transparent)]
    Record(Box<ErrorRecord>),

    #[error("{0}")]
    Exception(Arc<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Opaque(String),
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cause::Record(a), Cause::Record(b)) => a == b,
            (Cause::Exception(a), Cause::Exception(b)) => Arc::ptr_eq(a, b),
            (Cause::Opaque(a), Cause::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

/// A classified failure: kind, user-safe message, optional transport status,
/// diagnostic context, preserved cause and (for validation) per-field detail.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Diagnostic key/values. Logged, never branched on.
    pub context: BTreeMap<String, Value>,
    #[source]
    #[serde(serialize_with = "serialize_cause")]
    pub cause: Option<Cause>,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub field_errors: FieldErrors,
}

fn serialize_cause<S: Serializer>(cause: &Option<Cause>, serializer: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(c) => serializer.serialize_some(&c.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            context: BTreeMap::new(),
            cause: None,
            field_errors: FieldErrors::default(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn validation(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self {
            field_errors,
            ..Self::new(ErrorKind::Validation, message)
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn session_expired() -> Self {
        Self::new(
            ErrorKind::SessionExpired,
            ErrorKind::SessionExpired.default_message(),
        )
    }

    /// Failure of a third-party integration (maps, geocoding, PDF service, ...).
    pub fn external_service(service: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message).with_context("service", service)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Data, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Status-derived record. The kind follows [`ErrorKind::from_status`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status: Some(status),
            ..Self::new(ErrorKind::from_status(status), message)
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_field_errors(mut self, field_errors: FieldErrors) -> Self {
        self.field_errors = field_errors;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_transient()
    }

    /// True for statuses in [400, 500): the request itself was wrong.
    pub fn is_client_error(&self) -> bool {
        matches!(self.http_status, Some(400..=499))
    }

    /// Every validation message, flattened in field order. Falls back to `[message]`.
    pub fn all_validation_messages(&self) -> Vec<String> {
        if self.field_errors.is_empty() {
            return vec![self.message.clone()];
        }
        self.field_errors
            .iter()
            .flat_map(|(_, messages)| messages.iter().cloned())
            .collect()
    }

    /// Display text of every source below this record, outermost first.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            out.push(err.to_string());
            current = err.source();
        }
        out
    }

    /// Builds a record from an HTTP failure response body.
    ///
    /// `body` may be a structured object (`message`/`error`, `fieldErrors`/`errors`), plain
    /// text, or absent; `status_text` is the last resort before the kind's default message.
    pub fn from_response(status: u16, status_text: &str, body: &ResponseBody) -> Self {
        let message = match body {
            ResponseBody::Json(value) => json_message(value),
            ResponseBody::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
        .or_else(|| (!status_text.is_empty()).then(|| status_text.to_string()))
        .unwrap_or_else(|| ErrorKind::from_status(status).default_message().to_string());

        let mut record = ErrorRecord::from_status(status, message);
        if let ResponseBody::Json(value) = body {
            if let Some(fields) = value
                .get("fieldErrors")
                .or_else(|| value.get("errors"))
                .and_then(FieldErrors::from_json)
            {
                record.field_errors = fields;
            }
        }
        record
    }
}

/// Failure body as far as it could be decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

fn json_message(value: &Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Anything that can be classified. Construct via `From`.
#[derive(Debug)]
pub enum RawFailure {
    Record(ErrorRecord),
    Exception(Arc<dyn std::error::Error + Send + Sync>),
    Status(u16),
    Text(String),
    Opaque(Value),
}

impl From<ErrorRecord> for RawFailure {
    fn from(value: ErrorRecord) -> Self {
        RawFailure::Record(value)
    }
}

impl From<u16> for RawFailure {
    fn from(value: u16) -> Self {
        RawFailure::Status(value)
    }
}

impl From<String> for RawFailure {
    fn from(value: String) -> Self {
        RawFailure::Text(value)
    }
}

impl From<&str> for RawFailure {
    fn from(value: &str) -> Self {
        RawFailure::Text(value.to_string())
    }
}

impl From<Value> for RawFailure {
    fn from(value: Value) -> Self {
        RawFailure::Opaque(value)
    }
}

impl From<DomainError> for RawFailure {
    fn from(value: DomainError) -> Self {
        RawFailure::Exception(Arc::new(value))
    }
}

impl From<serde_json::Error> for RawFailure {
    fn from(value: serde_json::Error) -> Self {
        RawFailure::Exception(Arc::new(value))
    }
}

impl From<std::io::Error> for RawFailure {
    fn from(value: std::io::Error) -> Self {
        RawFailure::Exception(Arc::new(value))
    }
}

impl From<anyhow::Error> for RawFailure {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast::<ErrorRecord>() {
            Ok(record) => RawFailure::Record(record),
            Err(other) => {
                let boxed: Box<dyn std::error::Error + Send + Sync> = other.into();
                RawFailure::Exception(Arc::from(boxed))
            }
        }
    }
}

/// Deterministic, infallible classification of a raw failure.
pub fn classify(raw: impl Into<RawFailure>) -> ErrorRecord {
    match raw.into() {
        RawFailure::Record(record) => record,
        RawFailure::Exception(err) => {
            ErrorRecord::unknown(err.to_string()).with_cause(Cause::Exception(err))
        }
        RawFailure::Status(status) => {
            ErrorRecord::from_status(status, ErrorKind::from_status(status).default_message())
        }
        RawFailure::Text(text) => ErrorRecord::unknown(text),
        RawFailure::Opaque(value) => {
            let message = json_message(&value)
                .unwrap_or_else(|| ErrorKind::Unknown.default_message().to_string());
            ErrorRecord::unknown(message).with_cause(Cause::Opaque(value.to_string()))
        }
    }
}
