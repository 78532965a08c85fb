//! Application message kinds and inbound payloads.
//!
//! Applications see two kinds of messages, each with its own outbound
//! queue. Control frames (ping, pong, close) are handled by the pump and
//! are never exposed as a writable kind.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};

// ============================================================================
// MessageKind
// ============================================================================

/// Message class determining framing and queue routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// UTF-8 text frames.
    Text,
    /// Binary frames.
    Binary,
}

impl MessageKind {
    /// Returns the lowercase name of the kind.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// A data message received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    /// Kind of the received frame.
    pub kind: MessageKind,
    /// Raw payload.
    pub data: Bytes,
}

impl Incoming {
    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Text,
            data: data.into(),
        }
    }

    /// Creates a binary message.
    #[inline]
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Binary,
            data: data.into(),
        }
    }

    /// Returns the payload as a string slice if it is valid UTF-8.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Deserializes a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the payload is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.data)
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// Returns the application kind of `message`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKind`] for control and raw frames.
pub(crate) fn message_kind(message: &Message) -> Result<MessageKind> {
    match message {
        Message::Text(_) => Ok(MessageKind::Text),
        Message::Binary(_) => Ok(MessageKind::Binary),
        Message::Ping(_) => Err(Error::unsupported_kind("ping")),
        Message::Pong(_) => Err(Error::unsupported_kind("pong")),
        Message::Close(_) => Err(Error::unsupported_kind("close")),
        Message::Frame(_) => Err(Error::unsupported_kind("raw frame")),
    }
}

/// Builds the frame for `payload` of the given kind.
///
/// # Errors
///
/// Returns [`Error::EncodingFailed`] if a text payload is not valid UTF-8.
pub(crate) fn to_message(kind: MessageKind, payload: Bytes) -> Result<Message> {
    match kind {
        MessageKind::Text => {
            let text = String::from_utf8(Vec::from(payload))
                .map_err(|e| Error::encoding_failed("text", e))?;
            Ok(Message::text(text))
        }
        MessageKind::Binary => Ok(Message::Binary(payload)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(MessageKind::Text.to_string(), "text");
        assert_eq!(MessageKind::Binary.to_string(), "binary");
    }

    #[test]
    fn test_message_kind() {
        assert_eq!(message_kind(&Message::text("hi")).ok(), Some(MessageKind::Text));
        assert_eq!(
            message_kind(&Message::binary(vec![1, 2, 3])).ok(),
            Some(MessageKind::Binary)
        );
    }

    #[test]
    fn test_message_kind_rejects_control_frames() {
        let err = message_kind(&Message::Ping(Bytes::new())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedKind { ref kind } if kind == "ping"));

        let err = message_kind(&Message::Close(None)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedKind { .. }));
    }

    #[test]
    fn test_to_message_validates_text() {
        let message = to_message(MessageKind::Text, Bytes::from_static(b"ok")).expect("valid utf-8");
        assert_eq!(message, Message::text("ok"));

        let err = to_message(MessageKind::Text, Bytes::from_static(&[0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, Error::EncodingFailed { format: "text", .. }));

        let message = to_message(MessageKind::Binary, Bytes::from_static(&[0xff])).expect("any bytes");
        assert!(message.is_binary());
    }

    #[test]
    fn test_incoming_json() {
        let incoming = Incoming::text(r#"{"a":1}"#);
        let value: serde_json::Value = incoming.json().expect("valid json");
        assert_eq!(value["a"], 1);
        assert_eq!(incoming.as_text(), Some(r#"{"a":1}"#));
    }
}
