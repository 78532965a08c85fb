//! Best-effort, single-slot mailbox for terminal connection errors.
//!
//! Publishing never blocks the reporting loop. When the slot already holds
//! an unread error the new one is dropped and only logged, so consumers that
//! need every failure must drain [`Socket::next_error`](crate::Socket::next_error)
//! eagerly.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::error::Error;
use crate::identifiers::ConnectionId;

// ============================================================================
// ErrorSlot
// ============================================================================

/// Producer side of the error mailbox, held by the reader and writer loops.
#[derive(Clone)]
pub(crate) struct ErrorSlot {
    id: ConnectionId,
    sender: mpsc::Sender<Error>,
}

impl ErrorSlot {
    /// Creates the slot and its consumer.
    pub(crate) fn new(id: ConnectionId) -> (Self, mpsc::Receiver<Error>) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { id, sender }, receiver)
    }

    /// Attempts to deposit `error` without waiting.
    ///
    /// Returns `true` if the error was stored.
    pub(crate) fn report(&self, error: Error) -> bool {
        warn!(conn = %self.id, error = %error, "Dispatching connection error");

        match self.sender.try_send(error) {
            Ok(()) => true,
            Err(TrySendError::Full(error)) => {
                warn!(conn = %self.id, error = %error, "Error slot occupied, dropping error");
                false
            }
            Err(TrySendError::Closed(error)) => {
                warn!(conn = %self.id, error = %error, "No error consumer, dropping error");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::TransportError;

    fn read_error() -> Error {
        Error::read_failed(TransportError::DeadlineElapsed { timeout_ms: 1 })
    }

    #[tokio::test]
    async fn test_first_error_is_kept() {
        let (slot, mut errors) = ErrorSlot::new(ConnectionId::generate());

        assert!(slot.report(read_error()));
        assert!(!slot.report(Error::ConnectionClosed));

        let kept = errors.recv().await.expect("one error stored");
        assert!(kept.is_timeout());
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_report_without_consumer_does_not_block() {
        let (slot, errors) = ErrorSlot::new(ConnectionId::generate());
        drop(errors);

        assert!(!slot.report(read_error()));
    }

    #[tokio::test]
    async fn test_slot_frees_after_read() {
        let (slot, mut errors) = ErrorSlot::new(ConnectionId::generate());

        assert!(slot.report(read_error()));
        assert!(errors.recv().await.is_some());
        assert!(slot.report(read_error()));
    }
}
