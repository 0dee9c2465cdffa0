//! Configuration module for the log stream client.
//!
//! Provides the base URL of the dashboard backend and the timeouts that
//! bound each streaming session.

use std::time::Duration;
use url::Url;

use crate::errors::{LogStreamError, LogStreamResult};

/// Default base URL of the dashboard backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default inactivity timeout (10 seconds).
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the log stream client.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Base URL for API requests, without a trailing slash.
    pub base_url: String,
    /// Timeout for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Maximum time without receiving a chunk before the session is cancelled.
    pub inactivity_timeout: Duration,
    /// Optional bound on the whole session, from connect to terminal state.
    pub max_duration: Option<Duration>,
    /// Custom headers to include in requests.
    pub custom_headers: Vec<(String, String)>,
}

impl StreamConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LOG_STREAM_BASE_URL` (optional): Dashboard backend URL
    /// - `LOG_STREAM_CONNECT_TIMEOUT` (optional): Connect timeout in seconds
    /// - `LOG_STREAM_INACTIVITY_TIMEOUT` (optional): Inactivity timeout in seconds
    /// - `LOG_STREAM_MAX_DURATION` (optional): Overall session bound in seconds
    pub fn from_env() -> LogStreamResult<Self> {
        let mut builder = StreamConfigBuilder::new();

        if let Ok(base_url) = std::env::var("LOG_STREAM_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Some(secs) = env_secs("LOG_STREAM_CONNECT_TIMEOUT") {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        if let Some(secs) = env_secs("LOG_STREAM_INACTIVITY_TIMEOUT") {
            builder = builder.inactivity_timeout(Duration::from_secs(secs));
        }

        if let Some(secs) = env_secs("LOG_STREAM_MAX_DURATION") {
            builder = builder.max_duration(Duration::from_secs(secs));
        }

        builder.build()
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            max_duration: None,
            custom_headers: Vec::new(),
        }
    }
}

fn env_secs(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring non-numeric timeout");
            None
        }
    }
}

/// Builder for `StreamConfig`.
#[derive(Debug, Default)]
pub struct StreamConfigBuilder {
    base_url: Option<String>,
    connect_timeout: Option<Duration>,
    inactivity_timeout: Option<Duration>,
    max_duration: Option<Duration>,
    custom_headers: Vec<(String, String)>,
}

impl StreamConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the inactivity timeout.
    #[must_use]
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = Some(timeout);
        self
    }

    /// Sets the overall session bound.
    #[must_use]
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> LogStreamResult<StreamConfig> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let parsed = Url::parse(&base_url).map_err(|e| {
            LogStreamError::configuration(format!("Invalid base URL '{base_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LogStreamError::configuration(format!(
                "Base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let inactivity_timeout = self
            .inactivity_timeout
            .unwrap_or(DEFAULT_INACTIVITY_TIMEOUT);
        if inactivity_timeout.is_zero() {
            return Err(LogStreamError::configuration(
                "Inactivity timeout must be greater than zero",
            ));
        }

        if self.max_duration.is_some_and(|d| d.is_zero()) {
            return Err(LogStreamError::configuration(
                "Maximum duration must be greater than zero",
            ));
        }

        Ok(StreamConfig {
            base_url,
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            inactivity_timeout,
            max_duration: self.max_duration,
            custom_headers: self.custom_headers,
        })
    }
}
