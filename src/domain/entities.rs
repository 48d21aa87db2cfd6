//! Domain entities. Log envelopes and persisted cache records.

use crate::domain::ErrorRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

/// The user on whose behalf the failing operation ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One logged event. Built once by the reporter and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct LogEnvelope {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<LogUser>,
    pub extras: BTreeMap<String, Value>,
    pub error: ErrorRecord,
}

/// Persisted cache layout: `{"data": ..., "timestamp": ms, "expiresAt": ms | null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub data: T,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<i64>,
}

/// Cache record without its payload; lets `has` check expiry cheaply.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheRecordHeader {
    pub timestamp: i64,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<i64>,
}

impl CacheRecordHeader {
    /// An entry is expired from its `expiresAt` instant onward.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| now_ms >= at)
    }
}

impl<T> CacheRecord<T> {
    pub fn header(&self) -> CacheRecordHeader {
        CacheRecordHeader {
            timestamp: self.timestamp,
            expires_at: self.expires_at,
        }
    }
}
