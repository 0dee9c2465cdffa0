//! Summary accumulation on the consumer side.
//!
//! [`SummaryCollector`] is the reference consumer: it appends token
//! contents into a running summary, lets a `complete` frame's `summary`
//! replace that text, and records how the session ended.

use std::sync::{Arc, Mutex, PoisonError};

use super::sink::{CancelReason, FrameSink};
use crate::errors::LogStreamError;
use crate::types::{Frame, FrameKind};

/// How a collected session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The stream completed.
    Completed,
    /// The stream failed.
    Failed(LogStreamError),
    /// The stream was cancelled or timed out.
    Cancelled(CancelReason),
}

/// Point-in-time view of a [`SummaryCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummarySnapshot {
    /// Every frame received, in order.
    pub frames: Vec<Frame>,
    /// Concatenated token contents.
    pub tokens: String,
    /// Full summary from the `complete` frame, if it carried one.
    pub final_summary: Option<String>,
    /// Message of the latest `status` frame.
    pub last_status: Option<String>,
    /// Message of the `error` frame, if any.
    pub error_message: Option<String>,
    /// Terminal callback received, if any.
    pub outcome: Option<Outcome>,
    /// Number of terminal callbacks received. Always 0 or 1.
    pub terminal_calls: usize,
}

impl SummarySnapshot {
    /// Text to display: the final summary when present, otherwise the tokens.
    pub fn text(&self) -> &str {
        self.final_summary.as_deref().unwrap_or(&self.tokens)
    }

    /// Returns true once a terminal callback arrived.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    fn apply(&mut self, frame: Frame) {
        match frame.kind {
            FrameKind::Token => {
                if let Some(content) = &frame.content {
                    self.tokens.push_str(content);
                }
            }
            FrameKind::Status => self.last_status.clone_from(&frame.message),
            FrameKind::Complete => {
                if frame.summary.is_some() {
                    self.final_summary.clone_from(&frame.summary);
                }
            }
            FrameKind::Error => self.error_message.clone_from(&frame.message),
        }
        self.frames.push(frame);
    }

    fn finish(&mut self, outcome: Outcome) {
        self.terminal_calls += 1;
        self.outcome = Some(outcome);
    }
}

/// A [`FrameSink`] that accumulates the summary text.
///
/// Clones share state, so one clone can be handed to the session while
/// another is read.
#[derive(Debug, Clone, Default)]
pub struct SummaryCollector {
    inner: Arc<Mutex<SummarySnapshot>>,
}

impl SummaryCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SummarySnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current display text.
    pub fn text(&self) -> String {
        self.snapshot().text().to_string()
    }

    /// Clears everything collected so far.
    pub fn clear(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = SummarySnapshot::default();
    }

    fn with<F: FnOnce(&mut SummarySnapshot)>(&self, f: F) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

impl FrameSink for SummaryCollector {
    fn on_frame(&mut self, frame: Frame) {
        self.with(|s| s.apply(frame));
    }

    fn on_end(&mut self) {
        self.with(|s| s.finish(Outcome::Completed));
    }

    fn on_error(&mut self, error: &LogStreamError) {
        self.with(|s| s.finish(Outcome::Failed(error.clone())));
    }

    fn on_cancelled(&mut self, reason: &CancelReason) {
        self.with(|s| s.finish(Outcome::Cancelled(reason.clone())));
    }
}
