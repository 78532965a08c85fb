//! Connection pump configuration.
//!
//! Provides the timeouts and queue sizes a [`Socket`](crate::Socket) runs with.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use websocket_pump::Config;
//!
//! let config = Config::new()
//!     .with_read_timeout(Duration::from_secs(30))
//!     .with_outbound_capacity(1024);
//!
//! assert_eq!(config.ping_period(), Duration::from_secs(27));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Time allowed for the peer to show activity before the read side fails.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Time allowed for a single write, probe, or close frame.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of each outbound queue.
const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Capacity of the inbound queue.
const DEFAULT_INBOUND_CAPACITY: usize = 256;

// ============================================================================
// Config
// ============================================================================

/// Runtime settings for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Idle window after which a silent peer is considered dead.
    pub read_timeout: Duration,

    /// Upper bound for every write on the transport.
    pub write_timeout: Duration,

    /// Capacity of the text and of the binary outbound queue.
    pub outbound_capacity: usize,

    /// Capacity of the inbound queue.
    pub inbound_capacity: usize,

    /// Concatenate a drained backlog into a single frame.
    ///
    /// When `false` the backlog is written message by message and flushed once.
    pub coalesce: bool,

    /// Maximum inbound message size accepted by the transport.
    pub max_message_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Config {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            coalesce: false,
            max_message_size: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Config {
    /// Sets the idle read window.
    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write bound.
    #[inline]
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the capacity of each outbound queue.
    #[inline]
    #[must_use]
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    /// Sets the capacity of the inbound queue.
    #[inline]
    #[must_use]
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    /// Enables concatenation of queued backlog into one frame.
    #[inline]
    #[must_use]
    pub fn with_coalesce(mut self) -> Self {
        self.coalesce = true;
        self
    }

    /// Limits the size of inbound messages.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }
}

// ============================================================================
// Derived Values
// ============================================================================

impl Config {
    /// Keep-alive period: 90% of the read timeout.
    ///
    /// A probe is always sent before the peer's deadline would expire.
    #[inline]
    #[must_use]
    pub fn ping_period(&self) -> Duration {
        self.read_timeout * 9 / 10
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a timeout, capacity, or the derived
    /// ping period is zero.
    pub fn validate(&self) -> Result<()> {
        if self.write_timeout.is_zero() {
            return Err(Error::config("write_timeout must be non-zero"));
        }

        if self.ping_period().is_zero() {
            return Err(Error::config(format!(
                "read_timeout of {:?} leaves no room for a keep-alive period",
                self.read_timeout
            )));
        }

        if self.outbound_capacity == 0 || self.inbound_capacity == 0 {
            return Err(Error::config("queue capacities must be non-zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
