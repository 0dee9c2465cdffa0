//! Pipeline Log Stream
//!
//! An incremental client for the CI dashboard's streaming job-log summary
//! endpoint. The server answers with a long-lived `text/event-stream` body
//! carrying `status`, `token`, `complete` and `error` records; this crate
//! reassembles those records from arbitrarily split byte chunks, decodes
//! them into typed [`Frame`]s and pushes each one to a consumer the moment
//! it is recognized.
//!
//! # Features
//!
//! - **Reassembly**: event delimiters split across chunk reads are still recognized
//! - **Tolerance**: malformed records are dropped without ending the stream
//! - **Termination**: `complete` records, the `[DONE]` sentinel and end-of-body all finish a session
//! - **Cancellation**: idempotent cancel and an inactivity timeout per session
//! - **Observability**: tracing spans per session plus counters and a last-error field
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use pipeline_log_stream::{FrameKind, JobLogRef, LogStreamClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LogStreamClient::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!
//!     let mut frames = client.stream(JobLogRef::new(42, 1337));
//!     while let Some(frame) = frames.next().await {
//!         let frame = frame?;
//!         if frame.kind == FrameKind::Token {
//!             print!("{}", frame.content.unwrap_or_default());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Callback Example
//!
//! ```rust,no_run
//! use pipeline_log_stream::{JobLogRef, LogStreamClient, SummaryCollector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LogStreamClient::from_env()?;
//!     let collector = SummaryCollector::new();
//!
//!     let handle = client.open_stream(JobLogRef::new(42, 1337), collector.clone());
//!     handle.wait().await;
//!
//!     println!("{}", collector.snapshot().text());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;
pub mod observability;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{LogStreamClient, LogStreamClientBuilder, StreamSlot};
pub use config::{StreamConfig, StreamConfigBuilder};
pub use errors::{DecodeError, LogStreamError, LogStreamResult};
pub use streaming::{
    decode, CancelReason, ChannelSink, FrameSink, FrameStream, RawBlock, Reassembler,
    SessionState, StreamHandle, SummaryCollector, SummarySnapshot,
};
pub use types::{Frame, FrameKind, JobLogRef};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
