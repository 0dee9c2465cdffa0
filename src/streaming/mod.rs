//! Streaming log-summary protocol.
//!
//! Bytes from the response body go through the [`Reassembler`], which cuts
//! them into event blocks on blank lines; each block goes through
//! [`decode`] into a [`Frame`](crate::Frame); each frame is pushed to a
//! [`FrameSink`] in arrival order. A session ends exactly once: on a
//! `complete` or `error` frame, the `[DONE]` sentinel, end of body,
//! a transport failure, cancellation or timeout.

mod collector;
mod decoder;
mod handle;
mod reassembler;
mod session;
mod sink;

pub use collector::{Outcome, SummaryCollector, SummarySnapshot};
pub use decoder::{decode, DATA_PREFIX, END_SENTINEL};
pub use handle::StreamHandle;
pub use reassembler::{Blocks, RawBlock, Reassembler, EVENT_DELIMITER};
pub use session::SessionState;
pub use sink::{CancelReason, ChannelSink, FrameSink, FrameStream};

pub(crate) use session::{spawn, SessionOptions};
