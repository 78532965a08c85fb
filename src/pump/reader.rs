//! Reader loop: the only task reading from the transport.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, trace};

use crate::bus::{EventBus, Publisher, Subscription};
use crate::error::{Error, Result, TransportError};
use crate::message::Incoming;
use crate::transport::Transport;

use super::Shared;
use super::error_slot::ErrorSlot;

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the peer's close frame carries none.
const NO_STATUS_CODE: u16 = 1005;

// ============================================================================
// Reader
// ============================================================================

/// Owns the read half of the transport.
pub(crate) struct Reader<T> {
    pub(crate) stream: SplitStream<T>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) liveness: Publisher<()>,
    pub(crate) inbound: mpsc::Sender<Incoming>,
    pub(crate) errors: ErrorSlot,
    pub(crate) read_timeout: Duration,
}

/// Why the reader stopped without a failure.
enum Stop {
    Closing,
    ConsumerGone,
}

impl<T: Transport> Reader<T> {
    /// Runs until the connection closes or a read fails.
    pub(crate) async fn run(mut self, closing_bus: EventBus<()>) {
        let id = self.shared.id();
        let mut closing = closing_bus.subscribe().await;

        debug!(conn = %id, "Reader started");

        match self.read_loop(&mut closing).await {
            Ok(Stop::Closing) => {
                debug!(conn = %id, "Reader observed closing");
            }
            Ok(Stop::ConsumerGone) => {
                debug!(conn = %id, "Inbound consumer dropped");
                self.shared.close();
            }
            Err(error) if self.shared.is_closed() => {
                debug!(conn = %id, error = %error, "Read ended after close");
            }
            Err(error) => {
                self.errors.report(error);
                self.shared.close();
            }
        }

        debug!(conn = %id, "Reader stopped");
    }

    async fn read_loop(&mut self, closing: &mut Subscription<()>) -> Result<Stop> {
        let mut deadline = Instant::now() + self.read_timeout;

        loop {
            let next = tokio::select! {
                biased;

                _ = closing.recv() => return Ok(Stop::Closing),

                next = timeout_at(deadline, self.stream.next()) => next,
            };

            let message = match next {
                Err(_) => {
                    return Err(Error::read_failed(TransportError::DeadlineElapsed {
                        timeout_ms: self.read_timeout.as_millis() as u64,
                    }));
                }
                Ok(None) => return Err(Error::read_failed(peer_closed(None))),
                Ok(Some(Err(e))) => return Err(Error::read_failed(e)),
                Ok(Some(Ok(message))) => message,
            };

            // Refresh before the next blocking read.
            deadline = Instant::now() + self.read_timeout;

            let incoming = match message {
                Message::Text(text) => Incoming::text(Bytes::from(text)),
                Message::Binary(data) => Incoming::binary(data),
                Message::Close(frame) => return Err(Error::read_failed(peer_closed(frame))),
                Message::Ping(_) | Message::Pong(_) => {
                    trace!(conn = %self.shared.id(), "Control frame received");
                    if !self.signal_liveness(closing).await {
                        return Ok(Stop::Closing);
                    }
                    continue;
                }
                Message::Frame(_) => continue,
            };

            trace!(
                conn = %self.shared.id(),
                kind = %incoming.kind,
                len = incoming.data.len(),
                "Message received"
            );

            if !self.signal_liveness(closing).await {
                return Ok(Stop::Closing);
            }

            // Blocks while the inbound queue is full.
            tokio::select! {
                biased;

                _ = closing.recv() => return Ok(Stop::Closing),

                sent = self.inbound.send(incoming) => {
                    if sent.is_err() {
                        return Ok(Stop::ConsumerGone);
                    }
                }
            }
        }
    }

    /// Publishes a liveness event; returns `false` if closing won the race.
    async fn signal_liveness(&self, closing: &mut Subscription<()>) -> bool {
        tokio::select! {
            biased;

            _ = closing.recv() => false,

            // The writer may already be gone; nothing to reset then.
            _ = self.liveness.publish(()) => true,
        }
    }
}

fn peer_closed(frame: Option<CloseFrame>) -> TransportError {
    match frame {
        Some(frame) => TransportError::PeerClosed {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_owned(),
        },
        None => TransportError::PeerClosed {
            code: NO_STATUS_CODE,
            reason: String::new(),
        },
    }
}
