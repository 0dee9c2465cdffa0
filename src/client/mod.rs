//! Log stream client.
//!
//! Provides the main entry point for opening streaming log-summary sessions.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{StreamConfig, StreamConfigBuilder};
use crate::errors::{LogStreamError, LogStreamResult};
use crate::observability::{DefaultMetricsCollector, MetricsCollector, StreamMetrics};
use crate::streaming::{self, ChannelSink, FrameSink, FrameStream, SessionOptions, StreamHandle};
use crate::transport::{HttpRequest, HttpTransport, HttpTransportImpl};
use crate::types::JobLogRef;

/// The main log stream client.
///
/// Cheap to share behind an `Arc`; every call to [`open_stream`](Self::open_stream)
/// starts an independent session on the current Tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// use pipeline_log_stream::{JobLogRef, LogStreamClient, SummaryCollector};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = LogStreamClient::builder()
///         .base_url("http://localhost:8000")
///         .build()?;
///
///     let collector = SummaryCollector::new();
///     let handle = client.open_stream(JobLogRef::new(7, 99), collector.clone());
///     let state = handle.wait().await;
///
///     println!("{}: {}", state.name(), collector.text());
///     Ok(())
/// }
/// ```
pub struct LogStreamClient {
    config: StreamConfig,
    transport: Arc<dyn HttpTransport>,
    metrics: Arc<dyn MetricsCollector>,
}

impl LogStreamClient {
    /// Creates a new client builder.
    pub fn builder() -> LogStreamClientBuilder {
        LogStreamClientBuilder::new()
    }

    /// Creates a client from environment variables.
    ///
    /// See [`StreamConfig::from_env`].
    pub fn from_env() -> LogStreamResult<Self> {
        let config = StreamConfig::from_env()?;
        LogStreamClientBuilder::from_config(config).build()
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            inactivity_timeout: self.config.inactivity_timeout,
            max_duration: self.config.max_duration,
            headers: self.config.custom_headers.clone(),
        }
    }

    /// Starts streaming the summary of `job` into `sink`.
    ///
    /// Returns immediately; frames are pushed to the sink from a spawned
    /// task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open_stream<S: FrameSink>(&self, job: JobLogRef, sink: S) -> StreamHandle {
        tracing::debug!(job = %job, "Opening log stream");
        streaming::spawn(
            job,
            Arc::clone(&self.transport),
            Arc::clone(&self.metrics),
            self.session_options(),
            sink,
        )
    }

    /// Starts streaming the summary of `job` as a [`futures::Stream`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn stream(&self, job: JobLogRef) -> FrameStream {
        let (sink, rx) = ChannelSink::new();
        let handle = self.open_stream(job, sink);
        FrameStream::new(rx, handle)
    }

    /// Checks that the stream endpoint for `job` answers.
    ///
    /// Sends `HEAD`; a 2xx status yields `true`, any other status `false`.
    /// Only transport failures are errors.
    pub async fn probe(&self, job: JobLogRef) -> LogStreamResult<bool> {
        let mut request = HttpRequest::head(job.stream_path())
            .with_header(http::header::ACCEPT.as_str(), "text/event-stream");
        for (name, value) in &self.config.custom_headers {
            request = request.with_header(name.clone(), value.clone());
        }

        let response = self.transport.send(request).await?;
        tracing::debug!(job = %job, status = response.status, "Probed log stream endpoint");
        Ok(response.is_success())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Returns a snapshot of the metrics.
    pub fn metrics(&self) -> StreamMetrics {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for LogStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStreamClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for the log stream client.
pub struct LogStreamClientBuilder {
    config_builder: StreamConfigBuilder,
    config: Option<StreamConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl LogStreamClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config_builder: StreamConfigBuilder::new(),
            config: None,
            transport: None,
            metrics: None,
        }
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: StreamConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::new()
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(base_url);
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.connect_timeout(timeout);
        self
    }

    /// Sets the inactivity timeout.
    #[must_use]
    pub fn inactivity_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.inactivity_timeout(timeout);
        self
    }

    /// Sets the overall session bound.
    #[must_use]
    pub fn max_duration(mut self, max_duration: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.max_duration(max_duration);
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.header(name, value);
        self
    }

    /// Sets a custom transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom metrics collector.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the client.
    pub fn build(self) -> LogStreamResult<LogStreamClient> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_builder.build()?,
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransportImpl::new(config.base_url.clone(), config.connect_timeout).map_err(
                    |e| LogStreamError::configuration(format!("Failed to create transport: {e}")),
                )?,
            ),
        };

        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new()));

        Ok(LogStreamClient {
            config,
            transport,
            metrics,
        })
    }
}

impl Default for LogStreamClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the one live session of a consumer.
///
/// Starting a stream cancels the previous session and waits for it to
/// finish before the new one opens, so two sessions never feed the same
/// consumer at once.
#[derive(Debug, Default)]
pub struct StreamSlot {
    current: Mutex<Option<StreamHandle>>,
}

impl StreamSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current session with a new one for `job`.
    pub async fn start<S: FrameSink>(
        &self,
        client: &LogStreamClient,
        job: JobLogRef,
        sink: S,
    ) -> StreamHandle {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            if !previous.is_finished() {
                tracing::debug!(session = %previous.id(), "Cancelling previous log stream");
            }
            previous.cancel_and_wait().await;
        }
        let handle = client.open_stream(job, sink);
        *current = Some(handle.clone());
        handle
    }

    /// Cancels the current session, if any, and waits for it to finish.
    pub async fn cancel(&self) {
        let previous = self.current.lock().await.take();
        if let Some(previous) = previous {
            previous.cancel_and_wait().await;
        }
    }

    /// Returns the current session's handle.
    pub async fn current(&self) -> Option<StreamHandle> {
        self.current.lock().await.clone()
    }
}
