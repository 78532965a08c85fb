//! Writer loop: the only task writing to the transport.
//!
//! Multiplexes the two outbound queues, the closing and liveness signals, and
//! the keep-alive countdown. A probe is sent only when the countdown expires,
//! that is when neither a write nor a liveness signal happened for one period.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::sync::mpsc;
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::bus::{EventBus, Subscription};
use crate::error::{Error, Result, TransportError};
use crate::message::MessageKind;
use crate::transport::Transport;

use super::Shared;
use super::error_slot::ErrorSlot;
use super::keepalive::KeepAlive;

// ============================================================================
// Writer
// ============================================================================

/// Owns the write half of the transport.
pub(crate) struct Writer<T> {
    pub(crate) sink: SplitSink<T, Message>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) text: mpsc::Receiver<Message>,
    pub(crate) binary: mpsc::Receiver<Message>,
    pub(crate) errors: ErrorSlot,
    pub(crate) write_timeout: Duration,
    pub(crate) ping_period: Duration,
    pub(crate) coalesce: bool,
}

/// What woke the writer loop.
enum Event {
    Outbound(MessageKind, Message),
    Liveness(bool),
    Probe,
}

impl<T: Transport> Writer<T> {
    /// Runs until the connection closes or a write fails.
    pub(crate) async fn run(mut self, closing_bus: EventBus<()>, liveness_bus: EventBus<()>) {
        let id = self.shared.id();
        let mut closing = closing_bus.subscribe().await;
        let mut liveness = liveness_bus.subscribe().await;

        debug!(conn = %id, period = ?self.ping_period, "Writer started");

        match self.write_loop(&mut closing, &mut liveness).await {
            Ok(()) => self.send_close().await,
            Err(error) if self.shared.is_closed() => {
                debug!(conn = %id, error = %error, "Write ended after close");
            }
            Err(error) => {
                self.errors.report(error);
                self.shared.close();
            }
        }

        debug!(conn = %id, "Writer stopped");
    }

    async fn write_loop(
        &mut self,
        closing: &mut Subscription<()>,
        liveness: &mut Subscription<()>,
    ) -> Result<()> {
        let mut keepalive = KeepAlive::new(self.ping_period);
        let mut liveness_open = true;

        loop {
            // Closing goes first; the remaining sources are polled in random
            // order so a busy queue cannot starve the others.
            let event = tokio::select! {
                biased;

                _ = closing.recv() => return Ok(()),

                event = async {
                    tokio::select! {
                        Some(message) = self.text.recv() => Event::Outbound(MessageKind::Text, message),
                        Some(message) = self.binary.recv() => Event::Outbound(MessageKind::Binary, message),
                        event = liveness.recv(), if liveness_open => Event::Liveness(event.is_some()),
                        () = keepalive.fired() => Event::Probe,
                    }
                } => event,
            };

            match event {
                Event::Outbound(kind, message) => {
                    self.write_batch(kind, message).await?;
                    keepalive.reset();
                }
                Event::Liveness(true) => keepalive.reset(),
                // Reader is gone; closing follows.
                Event::Liveness(false) => liveness_open = false,
                Event::Probe => {
                    self.send_probe().await?;
                    keepalive.reset();
                    trace!(conn = %self.shared.id(), next = ?keepalive.deadline(), "Probe rearmed");
                }
            }
        }
    }

    /// Writes `first` and whatever of the same kind is already queued.
    async fn write_batch(&mut self, kind: MessageKind, first: Message) -> Result<()> {
        let queue = match kind {
            MessageKind::Text => &mut self.text,
            MessageKind::Binary => &mut self.binary,
        };

        // Only the backlog present now; later arrivals wait for the next batch.
        let backlog = queue.len();
        let mut batch = Vec::with_capacity(backlog + 1);
        batch.push(first);
        for _ in 0..backlog {
            match queue.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }

        let count = batch.len();
        let sink = &mut self.sink;
        let coalesce = self.coalesce;

        let written = timeout(self.write_timeout, async move {
            if coalesce && count > 1 {
                return sink.send(concatenate(kind, batch)).await;
            }
            for message in batch {
                sink.feed(message).await?;
            }
            sink.flush().await
        })
        .await;

        self.check_write(written)?;
        trace!(conn = %self.shared.id(), %kind, count, coalesce, "Batch written");
        Ok(())
    }

    async fn send_probe(&mut self) -> Result<()> {
        debug!(conn = %self.shared.id(), "Sending keep-alive probe");

        let probe = Message::Ping(Bytes::new());
        let written = timeout(self.write_timeout, self.sink.send(probe)).await;
        self.check_write(written)
    }

    /// Sends the close frame. Runs at most once, when the loop observes closing.
    async fn send_close(&mut self) {
        let id = self.shared.id();

        match timeout(self.write_timeout, self.sink.close()).await {
            Ok(Ok(())) => debug!(conn = %id, "Close frame sent"),
            Ok(Err(e)) => debug!(conn = %id, error = %e, "Close frame not sent"),
            Err(_) => debug!(conn = %id, "Close frame timed out"),
        }
    }

    fn check_write<E>(&self, written: StdResult<StdResult<(), E>, Elapsed>) -> Result<()>
    where
        E: Into<TransportError>,
    {
        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::write_failed(e)),
            Err(_) => Err(Error::write_failed(TransportError::DeadlineElapsed {
                timeout_ms: self.write_timeout.as_millis() as u64,
            })),
        }
    }
}

/// Joins a batch of same-kind messages into a single frame.
fn concatenate(kind: MessageKind, batch: Vec<Message>) -> Message {
    match kind {
        MessageKind::Text => {
            let mut text = String::new();
            for message in batch {
                if let Message::Text(part) = message {
                    text.push_str(part.as_str());
                }
            }
            Message::text(text)
        }
        MessageKind::Binary => {
            let mut data = BytesMut::new();
            for message in batch {
                data.extend_from_slice(&message.into_data());
            }
            Message::Binary(data.freeze())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
