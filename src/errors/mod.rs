//! Error types for the log stream client.
//!
//! Session-fatal failures are reported through [`LogStreamError`]. Failures
//! to decode a single event block are [`DecodeError`]s; those never end a
//! session and are only counted and logged.

use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for log stream operations.
pub type LogStreamResult<T> = Result<T, LogStreamError>;

/// Error type for session-level and client-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogStreamError {
    /// Configuration error (invalid base URL, zero timeout, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// The transport could not be opened (DNS, connect, TLS).
    #[error("Connection failed: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The connection dropped while the body was being read.
    #[error("Network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// The server sent an `error` record.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Message carried by the error record.
        message: String,
    },

    /// No terminal state was reached within the configured bound.
    #[error("Stream timed out after {after:?}")]
    Timeout {
        /// The bound that elapsed.
        after: Duration,
    },
}

impl LogStreamError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LogStreamError::Connection { .. }
                | LogStreamError::Network { .. }
                | LogStreamError::Timeout { .. }
                | LogStreamError::Http {
                    status: 500..=504,
                    ..
                }
        )
    }

    /// Short machine-readable name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            LogStreamError::Configuration { .. } => "configuration",
            LogStreamError::Connection { .. } => "connection",
            LogStreamError::Http { .. } => "http",
            LogStreamError::Network { .. } => "network",
            LogStreamError::Upstream { .. } => "upstream",
            LogStreamError::Timeout { .. } => "timeout",
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        LogStreamError::Configuration {
            message: message.into(),
        }
    }

    /// Message shown to the consumer in the synthesized `error` frame.
    pub(crate) fn frame_message(&self) -> String {
        match self {
            LogStreamError::Connection { message } => format!("Connection failed: {message}"),
            LogStreamError::Http { status, message } if message.is_empty() => {
                format!("Connection failed: HTTP {status}")
            }
            LogStreamError::Http { status, message } => {
                format!("Connection failed: HTTP {status}: {message}")
            }
            LogStreamError::Network { message } => format!("Stream interrupted: {message}"),
            other => other.to_string(),
        }
    }
}

impl From<TransportError> for LogStreamError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout { timeout } => LogStreamError::Timeout { after: timeout },
            TransportError::Connection { message } => LogStreamError::Connection { message },
            TransportError::InvalidResponse { message } => LogStreamError::Network { message },
        }
    }
}

/// Failure to decode one event block.
///
/// Recoverable: the block is discarded and the session continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The block has no `data:` payload line.
    #[error("event block has no data line")]
    MissingPayload,

    /// The payload is not a valid record.
    #[error("malformed record: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },

    /// The record names a kind outside `status | token | complete | error`.
    #[error("unknown frame kind '{kind}'")]
    UnknownKind {
        /// The kind as received.
        kind: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(LogStreamError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(LogStreamError::Http {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!LogStreamError::Http {
            status: 404,
            message: String::new()
        }
        .is_retryable());
        assert!(!LogStreamError::Upstream {
            message: "boom".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_frame_messages() {
        let err = LogStreamError::Http {
            status: 502,
            message: String::new(),
        };
        assert_eq!(err.frame_message(), "Connection failed: HTTP 502");

        let err = LogStreamError::Connection {
            message: "dns error".into(),
        };
        assert_eq!(err.frame_message(), "Connection failed: dns error");

        let err = LogStreamError::Network {
            message: "reset by peer".into(),
        };
        assert_eq!(err.frame_message(), "Stream interrupted: reset by peer");
    }

    #[test]
    fn test_transport_error_mapping() {
        let err: LogStreamError = TransportError::Connection {
            message: "refused".into(),
        }
        .into();
        assert_eq!(err.kind(), "connection");

        let err: LogStreamError = TransportError::InvalidResponse {
            message: "eof".into(),
        }
        .into();
        assert_eq!(err.kind(), "network");
    }
}
