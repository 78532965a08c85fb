//! Error types for the connection pump.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use websocket_pump::{Result, Socket};
//!
//! fn example(socket: &Socket) -> Result<()> {
//!     socket.send("hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Delivered via |
//! |----------|----------|---------------|
//! | Transport | [`Error::TransportReadFailed`], [`Error::TransportWriteFailed`] | error slot (terminal) |
//! | Local | [`Error::QueueFull`], [`Error::EncodingFailed`], [`Error::UnsupportedKind`], [`Error::ConnectionClosed`] | returned to caller |
//! | Handshake | [`Error::UpgradeFailed`], [`Error::DialFailed`] | returned to caller |
//! | Setup | [`Error::Config`], [`Error::Io`] | returned to caller |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::message::MessageKind;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error used for wrapped marshal failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// TransportError
// ============================================================================

/// Underlying cause of a transport read or write failure.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error reported by the WebSocket implementation.
    #[error(transparent)]
    WebSocket(#[from] WsError),

    /// The operation did not complete before its deadline.
    #[error("deadline of {timeout_ms}ms elapsed")]
    DeadlineElapsed {
        /// Milliseconds allowed for the operation.
        timeout_ms: u64,
    },

    /// The peer closed the connection.
    #[error("peer closed the connection (code {code}): {reason}")]
    PeerClosed {
        /// Close code sent by the peer (1005 if none was sent).
        code: u16,
        /// Close reason sent by the peer.
        reason: String,
    },
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Reading from the transport failed.
    ///
    /// Terminal for the connection; delivered through the error slot.
    #[error("Transport read failed: {source}")]
    TransportReadFailed {
        /// Cause of the failure.
        #[source]
        source: TransportError,
    },

    /// Writing to the transport failed.
    ///
    /// Terminal for the connection; delivered through the error slot.
    #[error("Transport write failed: {source}")]
    TransportWriteFailed {
        /// Cause of the failure.
        #[source]
        source: TransportError,
    },

    // ========================================================================
    // Local Errors
    // ========================================================================
    /// Marshaling a value for sending failed.
    #[error("Encoding as {format} failed: {source}")]
    EncodingFailed {
        /// Encoding that was attempted (`binary`, `text` or `json`).
        format: &'static str,
        /// Marshal error.
        #[source]
        source: BoxError,
    },

    /// The outbound queue for this kind is saturated.
    #[error("Outbound {kind} queue is full")]
    QueueFull {
        /// Kind of the rejected message.
        kind: MessageKind,
    },

    /// The message kind cannot be written by applications.
    #[error("Unsupported message kind: {kind}")]
    UnsupportedKind {
        /// Description of the rejected kind.
        kind: String,
    },

    /// The socket is closed.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// Server-side WebSocket upgrade failed.
    #[error("Upgrade failed: {message}")]
    UpgradeFailed {
        /// Description of the upgrade failure.
        message: String,
    },

    /// Client-side dial or handshake failed.
    #[error("Dial failed: {message}")]
    DialFailed {
        /// Description of the failure, including the response body on a bad handshake.
        message: String,
    },

    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a transport read error.
    #[inline]
    pub fn read_failed(source: impl Into<TransportError>) -> Self {
        Self::TransportReadFailed {
            source: source.into(),
        }
    }

    /// Creates a transport write error.
    #[inline]
    pub fn write_failed(source: impl Into<TransportError>) -> Self {
        Self::TransportWriteFailed {
            source: source.into(),
        }
    }

    /// Creates an encoding error wrapping the marshal failure.
    #[inline]
    pub fn encoding_failed(format: &'static str, source: impl Into<BoxError>) -> Self {
        Self::EncodingFailed {
            format,
            source: source.into(),
        }
    }

    /// Creates a queue full error.
    #[inline]
    pub fn queue_full(kind: MessageKind) -> Self {
        Self::QueueFull { kind }
    }

    /// Creates an unsupported kind error.
    #[inline]
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }

    /// Creates an upgrade error.
    #[inline]
    pub fn upgrade_failed(message: impl Into<String>) -> Self {
        Self::UpgradeFailed {
            message: message.into(),
        }
    }

    /// Creates a dial error.
    #[inline]
    pub fn dial_failed(message: impl Into<String>) -> Self {
        Self::DialFailed {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error terminated the connection.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::TransportReadFailed { .. } | Self::TransportWriteFailed { .. }
        )
    }

    /// Returns `true` if this is a synchronous failure local to the caller.
    ///
    /// Local errors never terminate the connection.
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::QueueFull { .. }
                | Self::EncodingFailed { .. }
                | Self::UnsupportedKind { .. }
                | Self::ConnectionClosed
        )
    }

    /// Returns `true` if a deadline elapsed.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::TransportReadFailed {
                source: TransportError::DeadlineElapsed { .. }
            } | Self::TransportWriteFailed {
                source: TransportError::DeadlineElapsed { .. }
            }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::queue_full(MessageKind::Text);
        assert_eq!(err.to_string(), "Outbound text queue is full");
    }

    #[test]
    fn test_read_timeout_display() {
        let err = Error::read_failed(TransportError::DeadlineElapsed { timeout_ms: 5000 });
        assert_eq!(
            err.to_string(),
            "Transport read failed: deadline of 5000ms elapsed"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::write_failed(TransportError::DeadlineElapsed { timeout_ms: 10 });
        let other_err = Error::read_failed(TransportError::PeerClosed {
            code: 1000,
            reason: String::new(),
        });

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_transport_error() {
        let read_err = Error::read_failed(WsError::ConnectionClosed);
        let full_err = Error::queue_full(MessageKind::Binary);

        assert!(read_err.is_transport_error());
        assert!(!full_err.is_transport_error());
    }

    #[test]
    fn test_is_local() {
        assert!(Error::queue_full(MessageKind::Text).is_local());
        assert!(Error::unsupported_kind("ping").is_local());
        assert!(Error::ConnectionClosed.is_local());
        assert!(!Error::dial_failed("refused").is_local());
    }

    #[test]
    fn test_encoding_failed_keeps_source() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err = Error::encoding_failed("json", json_err);

        let source = err.source().expect("source should be kept");
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
        assert!(err.to_string().starts_with("Encoding as json failed"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "address in use");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
