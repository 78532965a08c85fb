//! Transport layer.
//!
//! The pump runs over any [`Transport`]: a duplex message connection that
//! reads as a stream of [`Message`]s and writes as a sink of them. A
//! `tokio-tungstenite` `WebSocketStream` is the usual implementation; this
//! module also provides the two ways of establishing one.
//!
//! # Connection Lifecycle
//!
//! 1. Server: [`Listener::bind`] then [`Listener::accept`] (or [`accept`] on
//!    an already-accepted stream) upgrades an incoming request
//! 2. Client: [`connect`] dials an address with optional extra headers
//! 3. Either way the result is a running [`Socket`](crate::Socket)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `server` | Upgrade of incoming connections, origin policy |
//! | `client` | Outbound dial |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound dial.
pub mod client;

/// Upgrade of incoming connections.
pub mod server;

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::config::Config;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{DialConfig, connect};
pub use server::{AcceptConfig, Listener, OriginPolicy, accept};

// ============================================================================
// Transport
// ============================================================================

/// An established duplex message connection.
///
/// Implemented for every type that is both a stream of incoming messages and
/// a sink of outgoing ones. The pump splits it so that reads and writes are
/// each owned by exactly one task.
pub trait Transport:
    Stream<Item = StdResult<Message, WsError>> + Sink<Message, Error = WsError> + Send + Unpin + 'static
{
}

impl<T> Transport for T where
    T: Stream<Item = StdResult<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static
{
}

/// Protocol settings derived from the socket configuration.
pub(crate) fn ws_config(config: &Config) -> WebSocketConfig {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = config.max_message_size;
    ws_config
}
