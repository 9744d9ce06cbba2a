//! Environment-driven configuration

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_QUERY_PATH: &str = "rest/signals-query";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid signals base url '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Deployment environment name (`ENVIRONMENT`, defaults to `sandbox`)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Settings for talking to the signals query endpoint
#[derive(Debug, Clone)]
pub struct DataAccessConfig {
    pub base_url: Url,
    pub query_path: String,
    /// Extra time the scheduler waits before flushing a batch.
    /// Zero means "flush on the next scheduling tick".
    pub flush_delay: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for DataAccessConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            query_path: DEFAULT_QUERY_PATH.to_string(),
            flush_delay: Duration::ZERO,
            request_timeout: None,
        }
    }
}

impl DataAccessConfig {
    /// Read configuration from the process environment
    ///
    /// - `SIGNALS_BASE_URL`: server root (default `http://localhost:8080/`)
    /// - `SIGNALS_QUERY_PATH`: query endpoint relative to the root
    /// - `SIGNALS_FLUSH_DELAY_MS`: coalescing window in milliseconds
    /// - `SIGNALS_REQUEST_TIMEOUT_SECS`: HTTP timeout, unset for none
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var("SIGNALS_BASE_URL") {
            config.base_url = parse_base_url(&value)?;
        }

        if let Ok(path) = env::var("SIGNALS_QUERY_PATH") {
            if !path.trim().is_empty() {
                config.query_path = path.trim().trim_start_matches('/').to_string();
            }
        }

        config.flush_delay = env::var("SIGNALS_FLUSH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);

        config.request_timeout = env::var("SIGNALS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs);

        Ok(config)
    }

    pub fn with_base_url(mut self, value: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(value)?;
        Ok(self)
    }

    pub fn with_flush_delay(mut self, flush_delay: Duration) -> Self {
        self.flush_delay = flush_delay;
        self
    }

    /// Full URL of the signals query endpoint
    pub fn query_url(&self) -> Result<Url, ConfigError> {
        self.base_url
            .join(&self.query_path)
            .map_err(|source| ConfigError::InvalidBaseUrl {
                value: format!("{}{}", self.base_url, self.query_path),
                source,
            })
    }
}

// Url::join drops the last path segment unless the base ends with a slash.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    };
    Url::parse(&normalized).map_err(|source| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        source,
    })
}
