//! Consumer-facing delivery interfaces.

use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

use super::handle::StreamHandle;
use crate::errors::{LogStreamError, LogStreamResult};
use crate::types::Frame;

/// Why a session was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled the session.
    Requested,
    /// No terminal state was reached within the bound.
    TimedOut {
        /// The bound that elapsed.
        after: Duration,
    },
}

impl CancelReason {
    /// Returns true for timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CancelReason::TimedOut { .. })
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => f.write_str("cancelled by caller"),
            CancelReason::TimedOut { after } => write!(f, "timed out after {after:?}"),
        }
    }
}

/// Receives the frames of one session.
///
/// Calls arrive in stream order from the session's task. After the last
/// frame exactly one of `on_end`, `on_error` or `on_cancelled` is invoked;
/// nothing is invoked after it.
pub trait FrameSink: Send + 'static {
    /// A frame was decoded.
    fn on_frame(&mut self, frame: Frame);

    /// The stream completed normally.
    fn on_end(&mut self);

    /// The stream failed. An `error` frame describing the failure has
    /// already been passed to [`on_frame`](Self::on_frame).
    fn on_error(&mut self, error: &LogStreamError);

    /// The session was cancelled or timed out. No terminal frame is sent.
    fn on_cancelled(&mut self, reason: &CancelReason) {
        let _ = reason;
    }
}

/// Forwards frames into an ordered channel.
///
/// Failures and timeouts become `Err` items; explicit cancellation just
/// closes the channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogStreamResult<Frame>>,
}

impl ChannelSink {
    /// Creates a sink and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogStreamResult<Frame>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn on_frame(&mut self, frame: Frame) {
        // A closed receiver means the consumer went away; the session is
        // cancelled through its handle.
        let _ = self.tx.send(Ok(frame));
    }

    fn on_end(&mut self) {}

    fn on_error(&mut self, error: &LogStreamError) {
        let _ = self.tx.send(Err(error.clone()));
    }

    fn on_cancelled(&mut self, reason: &CancelReason) {
        if let CancelReason::TimedOut { after } = reason {
            let _ = self.tx.send(Err(LogStreamError::Timeout { after: *after }));
        }
    }
}

/// A session exposed as a [`Stream`] of frames.
///
/// Ends after the terminal item. Dropping it cancels the session.
#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::UnboundedReceiver<LogStreamResult<Frame>>,
    handle: StreamHandle,
}

impl FrameStream {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<LogStreamResult<Frame>>,
        handle: StreamHandle,
    ) -> Self {
        Self { rx, handle }
    }

    /// Returns the handle of the underlying session.
    pub fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    /// Cancels the underlying session.
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl Stream for FrameStream {
    type Item = LogStreamResult<Frame>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
