//! Core domain layer. No external I/O dependencies.
//!
//! Error taxonomy, user-facing copy, log envelopes, cache records and transport-neutral
//! request/response types. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod http;
pub mod messages;
pub mod taxonomy;

pub use entities::{CacheRecord, CacheRecordHeader, LogEnvelope, LogLevel, LogUser};
pub use errors::DomainError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Payload, RequestBody};
pub use messages::{FallbackCopy, fallback_copy, user_message};
pub use taxonomy::{
    Cause, ErrorKind, ErrorRecord, FieldErrors, RawFailure, ResponseBody, classify,
};
