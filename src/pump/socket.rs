//! Public handles of the connection pump.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::bus::EventBus;
use crate::codec::{Encode, encode};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::message::{Incoming, MessageKind, message_kind, to_message};
use crate::transport::Transport;

use super::Shared;
use super::error_slot::ErrorSlot;
use super::reader::Reader;
use super::writer::Writer;

// ============================================================================
// Socket
// ============================================================================

/// One full-duplex message connection driven by a reader and a writer task.
///
/// Writes are queued and never block; reads come from the inbound queue.
/// Terminal transport failures are delivered, best-effort, through
/// [`next_error`](Self::next_error).
///
/// Dropping the socket closes the connection.
///
/// # Example
///
/// ```ignore
/// let mut socket = Socket::open(ws_stream, Config::default())?;
/// socket.send("hello")?;
///
/// while let Some(message) = socket.recv().await {
///     println!("{:?}", message.as_text());
/// }
///
/// if let Some(error) = socket.try_next_error() {
///     eprintln!("connection failed: {error}");
/// }
/// ```
pub struct Socket {
    writer: SocketWriter,
    inbound: mpsc::Receiver<Incoming>,
    errors: mpsc::Receiver<Error>,
    config: Config,
}

impl Socket {
    /// Takes ownership of an established connection and starts the pump.
    ///
    /// Returns immediately; the reader and writer run as tokio tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn open<T: Transport>(transport: T, config: Config) -> Result<Self> {
        config.validate()?;

        let id = ConnectionId::generate();
        let (closing_tx, closing_bus) = EventBus::new();
        let (liveness_tx, liveness_bus) = EventBus::new();
        let shared = Arc::new(Shared::new(id, closing_tx));

        let (text_tx, text_rx) = mpsc::channel(config.outbound_capacity);
        let (binary_tx, binary_rx) = mpsc::channel(config.outbound_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
        let (slot, errors) = ErrorSlot::new(id);

        let (sink, stream) = transport.split::<Message>();

        let reader = Reader {
            stream,
            shared: Arc::clone(&shared),
            liveness: liveness_tx,
            inbound: inbound_tx,
            errors: slot.clone(),
            read_timeout: config.read_timeout,
        };

        let writer = Writer {
            sink,
            shared: Arc::clone(&shared),
            text: text_rx,
            binary: binary_rx,
            errors: slot,
            write_timeout: config.write_timeout,
            ping_period: config.ping_period(),
            coalesce: config.coalesce,
        };

        tokio::spawn(reader.run(closing_bus.clone()));
        tokio::spawn(writer.run(closing_bus, liveness_bus));

        debug!(conn = %id, "Connection pump started");

        Ok(Self {
            writer: SocketWriter {
                shared,
                text: text_tx,
                binary: binary_tx,
            },
            inbound: inbound_rx,
            errors,
            config,
        })
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.writer.shared.id()
    }

    /// Returns the configuration the socket runs with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` once the connection is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }

    /// Returns a cloneable write handle for other tasks.
    #[inline]
    #[must_use]
    pub fn writer(&self) -> SocketWriter {
        self.writer.clone()
    }

    /// Queues `payload` for sending. See [`SocketWriter::write`].
    ///
    /// # Errors
    ///
    /// See [`SocketWriter::write`].
    #[inline]
    pub fn write(&self, kind: MessageKind, payload: impl Into<Bytes>) -> Result<()> {
        self.writer.write(kind, payload)
    }

    /// Queues an application message. See [`SocketWriter::write_message`].
    ///
    /// # Errors
    ///
    /// See [`SocketWriter::write_message`].
    #[inline]
    pub fn write_message(&self, message: Message) -> Result<()> {
        self.writer.write_message(message)
    }

    /// Encodes and queues `value`. See [`SocketWriter::send`].
    ///
    /// # Errors
    ///
    /// See [`SocketWriter::send`].
    #[inline]
    pub fn send<V: Encode + ?Sized>(&self, value: &V) -> Result<()> {
        self.writer.send(value)
    }

    /// Closes the connection. Idempotent.
    #[inline]
    pub fn close(&self) {
        self.writer.close();
    }

    /// Receives the next message from the peer.
    ///
    /// Returns `None` once the reader has stopped and every message it
    /// queued has been received.
    pub async fn recv(&mut self) -> Option<Incoming> {
        self.inbound.recv().await
    }

    /// Waits for the next terminal error.
    ///
    /// Returns `None` once both loops have stopped and no error is pending.
    /// Delivery is best-effort: an error raised while another is still unread
    /// is dropped.
    pub async fn next_error(&mut self) -> Option<Error> {
        self.errors.recv().await
    }

    /// Returns a pending terminal error without waiting.
    pub fn try_next_error(&mut self) -> Option<Error> {
        self.errors.try_recv().ok()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.writer.close();
    }
}

// ============================================================================
// SocketWriter
// ============================================================================

/// Cloneable producer handle of a [`Socket`].
///
/// Every method is non-blocking; backpressure is reported as
/// [`Error::QueueFull`] instead of stalling the caller.
#[derive(Clone)]
pub struct SocketWriter {
    shared: Arc<Shared>,
    text: mpsc::Sender<Message>,
    binary: mpsc::Sender<Message>,
}

impl SocketWriter {
    /// Queues `payload` on the outbound queue of `kind`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the socket is closed
    /// - [`Error::EncodingFailed`] if a text payload is not valid UTF-8
    /// - [`Error::QueueFull`] if the queue is saturated
    pub fn write(&self, kind: MessageKind, payload: impl Into<Bytes>) -> Result<()> {
        self.ensure_open()?;
        let message = to_message(kind, payload.into())?;
        self.enqueue(kind, message)
    }

    /// Queues a text or binary message.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedKind`] for ping, pong, close and raw frames
    /// - [`Error::ConnectionClosed`] if the socket is closed
    /// - [`Error::QueueFull`] if the queue is saturated
    pub fn write_message(&self, message: Message) -> Result<()> {
        let kind = message_kind(&message)?;
        self.ensure_open()?;
        self.enqueue(kind, message)
    }

    /// Encodes `value` and queues it on the matching queue.
    ///
    /// See [`codec`](crate::codec) for how the kind is chosen.
    ///
    /// # Errors
    ///
    /// - [`Error::EncodingFailed`] if marshaling fails
    /// - any error of [`write`](Self::write)
    pub fn send<V: Encode + ?Sized>(&self, value: &V) -> Result<()> {
        let (kind, payload) = encode(value)?;
        self.write(kind, payload)
    }

    /// Closes the connection. Idempotent.
    #[inline]
    pub fn close(&self) {
        self.shared.close();
    }

    /// Returns `true` once the connection is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    fn enqueue(&self, kind: MessageKind, message: Message) -> Result<()> {
        let queue = match kind {
            MessageKind::Text => &self.text,
            MessageKind::Binary => &self.binary,
        };

        match queue.try_send(message) {
            Ok(()) => {
                trace!(conn = %self.shared.id(), %kind, "Message queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(Error::queue_full(kind)),
            Err(TrySendError::Closed(_)) => Err(Error::ConnectionClosed),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
