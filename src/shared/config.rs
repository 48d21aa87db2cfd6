//! Application configuration. Environment flag, request/query policy, cache and telemetry.

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_QUERY_READ_RETRIES: u32 = 3;
pub const DEFAULT_QUERY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_QUERY_MAX_DELAY_MS: u64 = 30_000;
/// Keeps this subsystem's entries apart from anything else sharing the store.
pub const DEFAULT_CACHE_PREFIX: &str = "realty_cache_";

/// Decides where error envelopes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// Lenient parse: anything starting with "prod" is production.
    pub fn parse(s: &str) -> Self {
        if s.trim().to_ascii_lowercase().starts_with("prod") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// "development" or "production". Read from REALTY_ENVIRONMENT.
    #[serde(default)]
    pub environment: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Resilient request executor
    // ─────────────────────────────────────────────────────────────────────────
    /// Abort a call with no response after this many ms. Read from REALTY_REQUEST_TIMEOUT_MS.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Additional attempts after the first failure. Read from REALTY_REQUEST_RETRIES.
    #[serde(default)]
    pub request_retries: Option<u32>,

    /// Fixed pause between attempts. Read from REALTY_RETRY_DELAY_MS.
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Query executor policy
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub query_read_retries: Option<u32>,

    #[serde(default)]
    pub query_base_delay_ms: Option<u64>,

    #[serde(default)]
    pub query_max_delay_ms: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Cache, telemetry, connectivity
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub cache_prefix: Option<String>,

    /// JSON file backing the cache. Unset means an in-memory store.
    #[serde(default)]
    pub cache_path: Option<String>,

    /// Telemetry endpoint used in production. Unset means console delivery.
    #[serde(default)]
    pub telemetry_url: Option<String>,

    /// Show a toast on online/offline transitions.
    #[serde(default)]
    pub offline_notifications: Option<bool>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("REALTY"));
        if let Ok(path) = std::env::var("REALTY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // APP_ENV is honoured without the prefix so a shared .env can drive it.
        if cfg.environment.is_none() {
            if let Ok(s) = std::env::var("APP_ENV") {
                cfg.environment = Some(s);
            }
        }
        Ok(cfg)
    }

    pub fn environment_or_default(&self) -> Environment {
        self.environment
            .as_deref()
            .map(Environment::parse)
            .unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn request_retries_or_default(&self) -> u32 {
        self.request_retries.unwrap_or(DEFAULT_RETRIES)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    pub fn query_read_retries_or_default(&self) -> u32 {
        self.query_read_retries
            .unwrap_or(DEFAULT_QUERY_READ_RETRIES)
    }

    pub fn query_base_delay(&self) -> Duration {
        Duration::from_millis(
            self.query_base_delay_ms
                .unwrap_or(DEFAULT_QUERY_BASE_DELAY_MS),
        )
    }

    pub fn query_max_delay(&self) -> Duration {
        Duration::from_millis(
            self.query_max_delay_ms
                .unwrap_or(DEFAULT_QUERY_MAX_DELAY_MS),
        )
    }

    pub fn cache_prefix_or_default(&self) -> String {
        self.cache_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string())
    }

    pub fn offline_notifications_or_default(&self) -> bool {
        self.offline_notifications.unwrap_or(true)
    }

    /// Returns true if an external telemetry destination is configured.
    pub fn is_telemetry_configured(&self) -> bool {
        self.telemetry_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.environment_or_default(), Environment::Development);
        assert_eq!(cfg.request_timeout(), Duration::from_millis(30_000));
        assert_eq!(cfg.request_retries_or_default(), 1);
        assert_eq!(cfg.retry_delay(), Duration::from_millis(1_000));
        assert_eq!(cfg.query_read_retries_or_default(), 3);
        assert_eq!(cfg.cache_prefix_or_default(), DEFAULT_CACHE_PREFIX);
        assert!(cfg.offline_notifications_or_default());
        assert!(!cfg.is_telemetry_configured());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PROD "), Environment::Production);
        assert_eq!(Environment::parse("dev"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }
}
