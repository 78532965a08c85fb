//! The connection pump.
//!
//! A [`Socket`] owns one transport connection and runs two tasks over it:
//!
//! ```text
//!  write()/send() ──► text queue ───┐                 ┌──────────────┐
//!                 ──► binary queue ─┼──► Writer loop ─►│              │
//!                                   │    (keep-alive)  │  transport   │
//!        liveness bus ──────────────┘        ▲         │  connection  │
//!              ▲                              │         │              │
//!              │          closing bus ────────┤         │              │
//!  recv() ◄── inbound queue ◄── Reader loop ◄─┴─────────│              │
//!  next_error() ◄── error slot ◄── (either loop)        └──────────────┘
//! ```
//!
//! - The writer is the only task that writes to the transport.
//! - The reader is the only task that reads from it.
//! - Whichever loop fails first reports the error and closes the socket.
//! - Closing tears down the closing bus; the writer then sends the close
//!   frame and the reader stops.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | Public [`Socket`] and [`SocketWriter`] handles |
//! | `reader` | Reader loop |
//! | `writer` | Writer loop with batching and keep-alive probes |
//! | `keepalive` | Idle-reset countdown |
//! | `error_slot` | Best-effort terminal error mailbox |

// ============================================================================
// Submodules
// ============================================================================

mod error_slot;
mod keepalive;
mod reader;
mod socket;
mod writer;

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::bus::Publisher;
use crate::identifiers::ConnectionId;

// ============================================================================
// Re-exports
// ============================================================================

pub use socket::{Socket, SocketWriter};

// ============================================================================
// Shared
// ============================================================================

/// State shared by the socket handles and both loops.
pub(crate) struct Shared {
    id: ConnectionId,
    closed: AtomicBool,
    closing: Mutex<Option<Publisher<()>>>,
}

impl Shared {
    pub(crate) fn new(id: ConnectionId, closing: Publisher<()>) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            closing: Mutex::new(Some(closing)),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Flips the closed flag and announces closing.
    ///
    /// Only the first call has an effect; returns whether this call closed.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        debug!(conn = %self.id, "Closing connection");

        if let Some(closing) = self.closing.lock().take() {
            closing.close();
        }

        true
    }
}

// ============================================================================
// Tests
// ============================================================================
