//! Type definitions for the log stream client.

pub mod common;
pub mod frame;

pub use common::JobLogRef;
pub use frame::{Frame, FrameKind};
