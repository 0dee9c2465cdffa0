//! Session lifecycle: connect, read, reassemble, decode, dispatch.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::decoder::decode;
use super::handle::StreamHandle;
use super::reassembler::{RawBlock, Reassembler};
use super::sink::{CancelReason, FrameSink};
use crate::errors::LogStreamError;
use crate::observability::MetricsCollector;
use crate::transport::{ByteStream, HttpRequest, HttpTransport};
use crate::types::{Frame, FrameKind, JobLogRef};

/// Lifecycle state of a session.
///
/// `idle → connecting → active → {completed | failed | cancelled}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not started.
    Idle,
    /// Opening the transport.
    Connecting,
    /// Reading the body.
    Active,
    /// Ended by a `complete` frame, the end sentinel, or end of body.
    Completed,
    /// Ended by an `error` frame or a transport failure.
    Failed(LogStreamError),
    /// Ended by the caller or by a timeout.
    Cancelled(CancelReason),
}

impl SessionState {
    /// Returns true for `completed`, `failed` and `cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed(_) | SessionState::Cancelled(_)
        )
    }

    /// Short name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Completed => "completed",
            SessionState::Failed(_) => "failed",
            SessionState::Cancelled(_) => "cancelled",
        }
    }
}

/// Per-session settings taken from the client configuration.
#[derive(Debug, Clone)]
pub(crate) struct SessionOptions {
    pub(crate) inactivity_timeout: Duration,
    pub(crate) max_duration: Option<Duration>,
    pub(crate) headers: Vec<(String, String)>,
}

enum End {
    Completed,
    Failed(LogStreamError),
    Cancelled(CancelReason),
}

/// What the session owns while active. Dropping it closes the transport.
struct Resources {
    body: Option<ByteStream>,
    reassembler: Option<Reassembler>,
}

impl Resources {
    fn none() -> Self {
        Self {
            body: None,
            reassembler: None,
        }
    }
}

struct Session<S> {
    job: JobLogRef,
    transport: Arc<dyn HttpTransport>,
    metrics: Arc<dyn MetricsCollector>,
    options: SessionOptions,
    sink: S,
    state_tx: watch::Sender<SessionState>,
}

/// Starts a session on the current Tokio runtime and returns its handle.
pub(crate) fn spawn<S: FrameSink>(
    job: JobLogRef,
    transport: Arc<dyn HttpTransport>,
    metrics: Arc<dyn MetricsCollector>,
    options: SessionOptions,
    sink: S,
) -> StreamHandle {
    let id = Uuid::new_v4();
    let (state_tx, state_rx) = watch::channel(SessionState::Idle);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let session = Session {
        job,
        transport,
        metrics,
        options,
        sink,
        state_tx,
    };
    let span = tracing::info_span!("log_stream", session = %id, job = %job);
    tokio::spawn(session.run(cancel_rx).instrument(span));

    StreamHandle::new(id, job, cancel_tx, state_rx)
}

/// Resolves once cancellation is requested. Never resolves if every handle
/// was dropped without cancelling.
async fn cancellation(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

impl<S: FrameSink> Session<S> {
    fn request(&self) -> HttpRequest {
        let mut request = HttpRequest::get(self.job.stream_path())
            .with_header(http::header::ACCEPT.as_str(), "text/event-stream")
            .with_header(http::header::CACHE_CONTROL.as_str(), "no-cache")
            .with_header(http::header::CONNECTION.as_str(), "keep-alive");
        for (name, value) in &self.options.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        request
    }

    /// Next timeout instant and the bound it enforces.
    fn deadline(&self, started: Instant, last_activity: Instant) -> (Instant, Duration) {
        let idle = self.options.inactivity_timeout;
        let idle_deadline = last_activity + idle;
        match self.options.max_duration {
            Some(max) if started + max < idle_deadline => (started + max, max),
            _ => (idle_deadline, idle),
        }
    }

    fn transition(&self, state: SessionState) {
        tracing::debug!(state = state.name(), "Session state changed");
        self.state_tx.send_replace(state);
    }

    async fn run(mut self, mut cancel_rx: watch::Receiver<bool>) {
        let started = Instant::now();
        let (deadline, mut bound) = self.deadline(started, started);
        let timer = tokio::time::sleep_until(deadline);
        tokio::pin!(timer);

        self.metrics.record_session_started();
        self.transition(SessionState::Connecting);

        let request = self.request();
        let opened = tokio::select! {
            biased;
            () = cancellation(&mut cancel_rx) => {
                return self.terminate(End::Cancelled(CancelReason::Requested), Resources::none());
            }
            () = &mut timer => {
                return self.terminate(
                    End::Cancelled(CancelReason::TimedOut { after: bound }),
                    Resources::none(),
                );
            }
            result = self.transport.send_streaming(request) => result,
        };

        let response = match opened {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                let message = http::StatusCode::from_u16(response.status)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                    .unwrap_or_default()
                    .to_string();
                let error = LogStreamError::Http {
                    status: response.status,
                    message,
                };
                drop(response);
                return self.fail_transport(error, Resources::none());
            }
            Err(e) => {
                let error = LogStreamError::Connection { message: e.detail() };
                return self.fail_transport(error, Resources::none());
            }
        };

        self.transition(SessionState::Active);
        let mut body = response.stream;
        let mut reassembler = Reassembler::new();

        loop {
            let item = tokio::select! {
                biased;
                () = cancellation(&mut cancel_rx) => {
                    let resources = Resources { body: Some(body), reassembler: Some(reassembler) };
                    return self.terminate(End::Cancelled(CancelReason::Requested), resources);
                }
                () = &mut timer => {
                    let resources = Resources { body: Some(body), reassembler: Some(reassembler) };
                    return self.terminate(End::Cancelled(CancelReason::TimedOut { after: bound }), resources);
                }
                item = body.next() => item,
            };

            match item {
                Some(Ok(chunk)) => {
                    self.metrics.record_chunk(chunk.len());
                    let (deadline, next_bound) = self.deadline(started, Instant::now());
                    bound = next_bound;
                    timer.as_mut().reset(deadline);

                    let end = dispatch(
                        reassembler.ingest(&chunk),
                        &mut self.sink,
                        self.metrics.as_ref(),
                        &cancel_rx,
                    );
                    if let Some(end) = end {
                        let resources = Resources {
                            body: Some(body),
                            reassembler: Some(reassembler),
                        };
                        return self.terminate(end, resources);
                    }
                }
                Some(Err(e)) => {
                    let error = LogStreamError::Network { message: e.detail() };
                    let resources = Resources {
                        body: Some(body),
                        reassembler: Some(reassembler),
                    };
                    return self.fail_transport(error, resources);
                }
                None => {
                    let end = reassembler.flush().and_then(|block| {
                        tracing::debug!("Flushing trailing block at end of body");
                        dispatch(
                            std::iter::once(block),
                            &mut self.sink,
                            self.metrics.as_ref(),
                            &cancel_rx,
                        )
                    });
                    let resources = Resources {
                        body: Some(body),
                        reassembler: Some(reassembler),
                    };
                    return self.terminate(end.unwrap_or(End::Completed), resources);
                }
            }
        }
    }

    /// Reports a transport failure as an `error` frame, then fails.
    fn fail_transport(mut self, error: LogStreamError, resources: Resources) {
        let frame = Frame::error(error.frame_message());
        self.metrics.record_frame(frame.kind);
        self.sink.on_frame(frame);
        self.terminate(End::Failed(error), resources);
    }

    /// Releases the transport and buffer, notifies the sink, publishes the
    /// terminal state. Consumes the session, so it runs once.
    fn terminate(mut self, end: End, resources: Resources) {
        let Resources { body, reassembler } = resources;
        if let Some(reassembler) = &reassembler {
            if reassembler.pending() > 0 {
                tracing::debug!(
                    pending_bytes = reassembler.pending(),
                    "Discarding unterminated input"
                );
            }
        }
        drop(body);
        drop(reassembler);

        let state = match end {
            End::Completed => {
                self.metrics.record_completed();
                self.sink.on_end();
                SessionState::Completed
            }
            End::Failed(error) => {
                tracing::warn!(error = %error, "Log stream failed");
                self.metrics.record_failed(&error);
                self.sink.on_error(&error);
                SessionState::Failed(error)
            }
            End::Cancelled(reason) => {
                if reason.is_timeout() {
                    tracing::warn!(reason = %reason, "Log stream timed out");
                } else {
                    tracing::debug!("Log stream cancelled");
                }
                self.metrics.record_cancelled(&reason);
                self.sink.on_cancelled(&reason);
                SessionState::Cancelled(reason)
            }
        };
        self.transition(state);
    }
}

/// Decodes and dispatches blocks in order until one ends the session.
fn dispatch<S: FrameSink>(
    blocks: impl Iterator<Item = RawBlock>,
    sink: &mut S,
    metrics: &dyn MetricsCollector,
    cancel_rx: &watch::Receiver<bool>,
) -> Option<End> {
    for block in blocks {
        if *cancel_rx.borrow() {
            return Some(End::Cancelled(CancelReason::Requested));
        }

        let frame = match decode(block.as_str()) {
            Ok(frame) => frame,
            Err(error) => {
                metrics.record_decode_failure();
                tracing::debug!(error = %error, block = %block, "Dropping undecodable event block");
                continue;
            }
        };

        let end = match frame.kind {
            FrameKind::Complete => Some(End::Completed),
            FrameKind::Error => Some(End::Failed(LogStreamError::Upstream {
                message: frame
                    .message
                    .clone()
                    .unwrap_or_else(|| "upstream reported an error".to_string()),
            })),
            FrameKind::Status | FrameKind::Token => None,
        };
        metrics.record_frame(frame.kind);
        sink.on_frame(frame);

        if end.is_some() {
            return end;
        }
    }
    None
}
