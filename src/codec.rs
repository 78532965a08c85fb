//! Encoding of application values into outbound messages.
//!
//! A value is turned into a `(kind, bytes)` pair by probing its [`Encode`]
//! capabilities in a fixed priority order; the first capability the value
//! exposes wins:
//!
//! | Priority | Capability | Kind | Payload |
//! |----------|------------|------|---------|
//! | 1 | [`Encode::raw_bytes`] | binary | verbatim |
//! | 2 | [`Encode::raw_text`] | text | verbatim |
//! | 3 | [`Encode::marshal_binary`] | binary | marshaled bytes |
//! | 4 | [`Encode::marshal_text`] | text | marshaled text |
//! | 5 | [`Encode::to_json`] | text | JSON document |
//!
//! Byte containers, strings and [`serde_json::Value`] implement [`Encode`]
//! out of the box. Any [`Serialize`] value can be sent as JSON through the
//! [`Json`] wrapper.
//!
//! # Example
//!
//! ```ignore
//! use websocket_pump::codec::{Encode, Json};
//!
//! #[derive(serde::Serialize)]
//! struct Hello { name: String }
//!
//! socket.send(&b"\x00\x01"[..])?;                       // binary
//! socket.send("ping")?;                                // text
//! socket.send(&Json(Hello { name: "a".into() }))?;     // JSON text
//! ```

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::{BoxError, Error, Result};
use crate::message::MessageKind;

// ============================================================================
// Encode
// ============================================================================

/// Capabilities a value exposes for being sent over a socket.
///
/// Every probe defaults to `None`; implementors override the ones their type
/// supports. Returning `Some(Err(..))` from a marshal probe fails the send
/// with [`Error::EncodingFailed`].
pub trait Encode {
    /// Raw byte sequence sent verbatim as a binary message.
    fn raw_bytes(&self) -> Option<Bytes> {
        None
    }

    /// Character string sent verbatim as a text message.
    fn raw_text(&self) -> Option<&str> {
        None
    }

    /// Binary marshaling.
    fn marshal_binary(&self) -> Option<std::result::Result<Vec<u8>, BoxError>> {
        None
    }

    /// Text marshaling.
    fn marshal_text(&self) -> Option<std::result::Result<String, BoxError>> {
        None
    }

    /// Generic structured serialization.
    fn to_json(&self) -> Option<serde_json::Result<Vec<u8>>> {
        None
    }
}

/// Resolves the kind and payload for `value`.
///
/// # Errors
///
/// - [`Error::EncodingFailed`] if the selected marshal step fails
/// - [`Error::UnsupportedKind`] if `value` exposes no capability at all
pub fn encode<V: Encode + ?Sized>(value: &V) -> Result<(MessageKind, Bytes)> {
    if let Some(bytes) = value.raw_bytes() {
        return Ok((MessageKind::Binary, bytes));
    }

    if let Some(text) = value.raw_text() {
        return Ok((MessageKind::Text, Bytes::copy_from_slice(text.as_bytes())));
    }

    if let Some(marshaled) = value.marshal_binary() {
        let data = marshaled.map_err(|e| Error::encoding_failed("binary", e))?;
        return Ok((MessageKind::Binary, Bytes::from(data)));
    }

    if let Some(marshaled) = value.marshal_text() {
        let text = marshaled.map_err(|e| Error::encoding_failed("text", e))?;
        return Ok((MessageKind::Text, Bytes::from(text)));
    }

    if let Some(serialized) = value.to_json() {
        let data = serialized.map_err(|e| Error::encoding_failed("json", e))?;
        return Ok((MessageKind::Text, Bytes::from(data)));
    }

    Err(Error::unsupported_kind("value exposes no encoding"))
}

// ============================================================================
// Json
// ============================================================================

/// Sends the wrapped value as a JSON text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Encode for Json<T> {
    fn to_json(&self) -> Option<serde_json::Result<Vec<u8>>> {
        Some(serde_json::to_vec(&self.0))
    }
}

// ============================================================================
// Built-in Implementations
// ============================================================================

impl Encode for [u8] {
    fn raw_bytes(&self) -> Option<Bytes> {
        Some(Bytes::copy_from_slice(self))
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn raw_bytes(&self) -> Option<Bytes> {
        Some(Bytes::copy_from_slice(self))
    }
}

impl Encode for Vec<u8> {
    fn raw_bytes(&self) -> Option<Bytes> {
        Some(Bytes::copy_from_slice(self))
    }
}

impl Encode for Bytes {
    fn raw_bytes(&self) -> Option<Bytes> {
        Some(self.clone())
    }
}

impl Encode for str {
    fn raw_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl Encode for String {
    fn raw_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl Encode for Value {
    fn to_json(&self) -> Option<serde_json::Result<Vec<u8>>> {
        Some(serde_json::to_vec(self))
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn raw_bytes(&self) -> Option<Bytes> {
        (**self).raw_bytes()
    }

    fn raw_text(&self) -> Option<&str> {
        (**self).raw_text()
    }

    fn marshal_binary(&self) -> Option<std::result::Result<Vec<u8>, BoxError>> {
        (**self).marshal_binary()
    }

    fn marshal_text(&self) -> Option<std::result::Result<String, BoxError>> {
        (**self).marshal_text()
    }

    fn to_json(&self) -> Option<serde_json::Result<Vec<u8>>> {
        (**self).to_json()
    }
}

// ============================================================================
// Tests
// ============================================================================
