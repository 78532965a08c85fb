//! WebSocket Pump - Concurrent full-duplex message connections.
//!
//! This library wraps an established WebSocket connection in a [`Socket`]
//! that application code can write to from many tasks at once while a
//! single reader and a single writer task drive the wire.
//!
//! # Architecture
//!
//! Every socket runs two loops over one split transport:
//!
//! - **Writer**: drains the text and binary outbound queues in batches and
//!   sends a keep-alive ping whenever the connection has been idle for one
//!   ping period
//! - **Reader**: reads frames under a deadline, forwards data messages to the
//!   inbound queue, and signals liveness to the writer on every frame
//!
//! Key design principles:
//!
//! - Writes never block: a saturated queue is reported as
//!   [`Error::QueueFull`]
//! - Messages of one kind keep their submission order
//! - The first loop to fail reports a single terminal error and closes
//! - Closing is idempotent and safe from any task
//!
//! # Quick Start
//!
//! ```no_run
//! use websocket_pump::transport::{DialConfig, connect};
//! use websocket_pump::{Json, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut socket = connect("ws://127.0.0.1:9000/feed", &DialConfig::new()).await?;
//!
//!     socket.send("subscribe")?;
//!     socket.send(&Json(serde_json::json!({"channel": "trades"})))?;
//!
//!     while let Some(message) = socket.recv().await {
//!         println!("{:?}", message.as_text());
//!     }
//!
//!     if let Some(error) = socket.try_next_error() {
//!         eprintln!("connection ended: {error}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bus`] | Single-producer, multi-consumer event fan-out |
//! | [`codec`] | Encoding of application values |
//! | [`config`] | Socket timing and capacity settings |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Connection identifiers |
//! | [`message`] | Message kinds and inbound payloads |
//! | [`pump`] | The [`Socket`] and its reader/writer loops |
//! | [`transport`] | Listener, accept and dial |

// ============================================================================
// Modules
// ============================================================================

/// Event fan-out used for the closing and liveness signals.
pub mod bus;

/// Encoding of application values into outbound messages.
pub mod codec;

/// Socket configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Message kinds and inbound payloads.
pub mod message;

/// The connection pump.
pub mod pump;

/// Transport capability, listener and dial.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Pump types
pub use pump::{Socket, SocketWriter};

// Configuration
pub use config::Config;

// Codec types
pub use codec::{Encode, Json, encode};

// Message types
pub use message::{Incoming, MessageKind};

// Error types
pub use error::{Error, Result, TransportError};

// Identifier types
pub use identifiers::ConnectionId;

// Transport types
pub use transport::{
    AcceptConfig, DialConfig, Listener, OriginPolicy, Transport, accept, connect,
};
