//! Single-producer, multi-consumer event fan-out.
//!
//! The pump uses two buses per connection: one carrying liveness signals
//! from the reader to the writer, and one whose teardown announces that the
//! connection is closing.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────┐      ┌──────────────┐
//!  Publisher ────►│                      │─────►│ Subscription │
//!                 │  coordinator task    │      └──────────────┘
//!  EventBus  ────►│  (owns subscribers)  │      ┌──────────────┐
//!  subscribe()    │                      │─────►│ Subscription │
//!                 └──────────────────────┘      └──────────────┘
//! ```
//!
//! Publishes and subscription requests are both funneled through the
//! coordinator, so a subscriber is never added in the middle of a broadcast.
//! Dropping (or [closing](Publisher::close)) the publisher tears the bus down:
//! every subscription drains and then reports `None`, and subscriptions
//! requested afterwards report `None` immediately.

// ============================================================================
// Imports
// ============================================================================

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Buffered events per subscriber before delivery waits for the consumer.
const SUBSCRIBER_CAPACITY: usize = 16;

// ============================================================================
// Types
// ============================================================================

/// Returned when publishing to a bus whose coordinator has stopped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event bus closed")]
pub struct BusClosed;

/// Registration request handled by the coordinator.
struct Registration<E> {
    sender: mpsc::Sender<E>,
    registered: oneshot::Sender<()>,
}

// ============================================================================
// EventBus
// ============================================================================

/// Handle used to request new subscriptions.
///
/// Cheap to clone; every clone talks to the same coordinator.
pub struct EventBus<E> {
    registrations: mpsc::UnboundedSender<Registration<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
        }
    }
}

impl<E> EventBus<E>
where
    E: Clone + Send + 'static,
{
    /// Creates a bus and spawns its coordinator task.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new() -> (Publisher<E>, Self) {
        let (events_tx, events_rx) = mpsc::channel(1);
        let (registrations_tx, registrations_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_coordinator(events_rx, registrations_rx));

        (
            Publisher { events: events_tx },
            Self {
                registrations: registrations_tx,
            },
        )
    }

    /// Registers a new subscriber.
    ///
    /// Resolves once the coordinator has registered the subscription, so every
    /// event published afterwards is delivered to it. If the bus is already
    /// torn down, or is torn down before the request is handled, the returned
    /// subscription is already closed.
    pub async fn subscribe(&self) -> Subscription<E> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let (registered_tx, registered_rx) = oneshot::channel();

        let registration = Registration {
            sender,
            registered: registered_tx,
        };

        // A rejected request drops the sender, leaving the receiver closed.
        if self.registrations.send(registration).is_ok() {
            let _ = registered_rx.await;
        }

        Subscription { receiver }
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// The single producer side of a bus.
pub struct Publisher<E> {
    events: mpsc::Sender<E>,
}

impl<E> Publisher<E> {
    /// Publishes an event to every registered subscriber.
    ///
    /// Waits while the coordinator is still busy with the previous event.
    ///
    /// # Errors
    ///
    /// Returns [`BusClosed`] if the coordinator is no longer running.
    pub async fn publish(&self, event: E) -> Result<(), BusClosed> {
        self.events.send(event).await.map_err(|_| BusClosed)
    }

    /// Tears the bus down.
    ///
    /// Events already published are still delivered; afterwards every
    /// subscription reports `None`.
    #[inline]
    pub fn close(self) {
        drop(self);
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A consumer handle receiving every event published after registration.
pub struct Subscription<E> {
    receiver: mpsc::Receiver<E>,
}

impl<E> Subscription<E> {
    /// Receives the next event, or `None` once the bus is torn down.
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Receives an event if one is ready.
    ///
    /// Returns `None` when nothing is buffered or the bus is torn down.
    pub fn try_recv(&mut self) -> Option<E> {
        self.receiver.try_recv().ok()
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Owns the subscriber list and serializes publishes against registrations.
async fn run_coordinator<E>(
    mut events: mpsc::Receiver<E>,
    mut registrations: mpsc::UnboundedReceiver<Registration<E>>,
) where
    E: Clone + Send + 'static,
{
    let mut subscribers: Vec<mpsc::Sender<E>> = Vec::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                broadcast(&mut subscribers, event).await;
            }

            Some(registration) = registrations.recv() => {
                subscribers.push(registration.sender);
                let _ = registration.registered.send(());
                trace!(subscribers = subscribers.len(), "Subscriber registered");
            }
        }
    }

    // Closing every sender ends every subscription.
    subscribers.clear();

    // Reject registrations that raced with teardown.
    registrations.close();
    while registrations.try_recv().is_ok() {}

    trace!("Event bus torn down");
}

/// Delivers one event to each subscriber in registration order.
async fn broadcast<E: Clone>(subscribers: &mut Vec<mpsc::Sender<E>>, event: E) {
    let mut index = 0;
    while index < subscribers.len() {
        if subscribers[index].send(event.clone()).await.is_err() {
            // Subscription dropped
            subscribers.remove(index);
        } else {
            index += 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
