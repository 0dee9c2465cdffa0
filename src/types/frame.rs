//! Decoded protocol frames.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DecodeError;

/// Kind of a decoded frame. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Progress information (`message`).
    Status,
    /// Incremental text fragment to append (`content`).
    Token,
    /// End of the summary (`message`, optionally `summary`).
    Complete,
    /// Upstream failure (`message`).
    Error,
}

impl FrameKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Status => "status",
            FrameKind::Token => "token",
            FrameKind::Complete => "complete",
            FrameKind::Error => "error",
        }
    }

    /// Returns true for kinds that end a session.
    pub fn is_terminal(self) -> bool {
        matches!(self, FrameKind::Complete | FrameKind::Error)
    }
}

impl FromStr for FrameKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(FrameKind::Status),
            "token" => Ok(FrameKind::Token),
            "complete" => Ok(FrameKind::Complete),
            "error" => Ok(FrameKind::Error),
            other => Err(DecodeError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded unit of the streaming protocol.
///
/// `kind` determines which payload field is meaningful: `content` for
/// tokens, `message` for the others, and `summary` only on some `complete`
/// frames where it supersedes the accumulated tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame kind.
    pub kind: FrameKind,
    /// Text fragment of a `token` frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full summary text on a `complete` frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Frame {
    fn bare(kind: FrameKind) -> Self {
        Self {
            kind,
            content: None,
            message: None,
            summary: None,
        }
    }

    /// Creates a `status` frame.
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(FrameKind::Status)
        }
    }

    /// Creates a `token` frame.
    pub fn token(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::bare(FrameKind::Token)
        }
    }

    /// Creates a `complete` frame with no message, as produced by the end sentinel.
    pub fn complete() -> Self {
        Self::bare(FrameKind::Complete)
    }

    /// Creates a `complete` frame carrying the full summary.
    pub fn complete_with_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::bare(FrameKind::Complete)
        }
    }

    /// Creates an `error` frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(FrameKind::Error)
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns true if this frame ends a session.
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}
