//! Observability module for the log stream client.
//!
//! Sessions log through `tracing` inside a span carrying the session ID and
//! job; counters and the last fatal error are kept by a [`MetricsCollector`].

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig, LogLevel};
pub use metrics::{DefaultMetricsCollector, LastError, MetricsCollector, StreamMetrics};
