//! Metrics collection for log stream sessions.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::errors::LogStreamError;
use crate::streaming::CancelReason;
use crate::types::FrameKind;

/// Metrics collector interface.
pub trait MetricsCollector: Send + Sync {
    /// Records a session entering `connecting`.
    fn record_session_started(&self);

    /// Records a body chunk.
    fn record_chunk(&self, bytes: usize);

    /// Records a frame passed to the sink.
    fn record_frame(&self, kind: FrameKind);

    /// Records a dropped, undecodable block.
    fn record_decode_failure(&self);

    /// Records a session reaching `completed`.
    fn record_completed(&self);

    /// Records a session reaching `failed`.
    fn record_failed(&self, error: &LogStreamError);

    /// Records a session reaching `cancelled`.
    fn record_cancelled(&self, reason: &CancelReason);

    /// Gets current metrics.
    fn snapshot(&self) -> StreamMetrics;

    /// Resets all metrics.
    fn reset(&self);
}

/// Most recent fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// The error.
    pub error: LogStreamError,
    /// When it was recorded.
    pub at: DateTime<Utc>,
}

/// Stream metrics snapshot.
#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    /// Sessions started.
    pub sessions_started: u64,
    /// Sessions completed.
    pub sessions_completed: u64,
    /// Sessions failed.
    pub sessions_failed: u64,
    /// Sessions cancelled by the caller.
    pub sessions_cancelled: u64,
    /// Sessions cancelled by a timeout.
    pub sessions_timed_out: u64,
    /// Body chunks received.
    pub chunks_received: u64,
    /// Body bytes received.
    pub bytes_received: u64,
    /// Frames passed to sinks.
    pub frames_dispatched: u64,
    /// Token frames passed to sinks.
    pub tokens_dispatched: u64,
    /// Blocks dropped because they did not decode.
    pub decode_failures: u64,
    /// Most recent fatal error, timeouts included.
    pub last_error: Option<LastError>,
}

impl StreamMetrics {
    /// Sessions in a terminal state.
    pub fn sessions_finished(&self) -> u64 {
        self.sessions_completed
            + self.sessions_failed
            + self.sessions_cancelled
            + self.sessions_timed_out
    }
}

/// Default metrics collector implementation.
#[derive(Debug, Default)]
pub struct DefaultMetricsCollector {
    sessions_started: AtomicU64,
    sessions_completed: AtomicU64,
    sessions_failed: AtomicU64,
    sessions_cancelled: AtomicU64,
    sessions_timed_out: AtomicU64,
    chunks_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_dispatched: AtomicU64,
    tokens_dispatched: AtomicU64,
    decode_failures: AtomicU64,
    last_error: RwLock<Option<LastError>>,
}

impl DefaultMetricsCollector {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn set_last_error(&self, error: LogStreamError) {
        if let Ok(mut last) = self.last_error.write() {
            *last = Some(LastError {
                error,
                at: Utc::now(),
            });
        }
    }
}

impl MetricsCollector for DefaultMetricsCollector {
    fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    fn record_chunk(&self, bytes: usize) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn record_frame(&self, kind: FrameKind) {
        self.frames_dispatched.fetch_add(1, Ordering::Relaxed);
        if kind == FrameKind::Token {
            self.tokens_dispatched.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self, error: &LogStreamError) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
        self.set_last_error(error.clone());
    }

    fn record_cancelled(&self, reason: &CancelReason) {
        match reason {
            CancelReason::Requested => {
                self.sessions_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            CancelReason::TimedOut { after } => {
                self.sessions_timed_out.fetch_add(1, Ordering::Relaxed);
                self.set_last_error(LogStreamError::Timeout { after: *after });
            }
        }
    }

    fn snapshot(&self) -> StreamMetrics {
        StreamMetrics {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            sessions_cancelled: self.sessions_cancelled.load(Ordering::Relaxed),
            sessions_timed_out: self.sessions_timed_out.load(Ordering::Relaxed),
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_dispatched: self.frames_dispatched.load(Ordering::Relaxed),
            tokens_dispatched: self.tokens_dispatched.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            last_error: self.last_error.read().ok().and_then(|last| last.clone()),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.sessions_started,
            &self.sessions_completed,
            &self.sessions_failed,
            &self.sessions_cancelled,
            &self.sessions_timed_out,
            &self.chunks_received,
            &self.bytes_received,
            &self.frames_dispatched,
            &self.tokens_dispatched,
            &self.decode_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut last) = self.last_error.write() {
            *last = None;
        }
    }
}
