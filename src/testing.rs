//! Test doubles for the pump.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::pin::Pin;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Logging
// ============================================================================

/// Routes crate logs to the test output, filtered by `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Real WebSocket pair
// ============================================================================

/// Two WebSocket endpoints connected through an in-memory pipe.
pub(crate) async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);

    let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

    (server, client)
}

// ============================================================================
// MockTransport
// ============================================================================

/// Callback run after each message the writer sends.
type WriteHook = Box<dyn Fn(&Message) + Send + Sync>;

#[derive(Default)]
struct MockState {
    sent: Mutex<Vec<Message>>,
    on_write: Mutex<Option<WriteHook>>,
    written: Notify,
    closes: AtomicUsize,
    fail_writes: AtomicBool,
    stalled: AtomicBool,
}

/// Scriptable transport recording everything the writer sends.
pub(crate) struct MockTransport {
    incoming: mpsc::UnboundedReceiver<StdResult<Message, WsError>>,
    state: Arc<MockState>,
}

/// Test-side controls of a [`MockTransport`].
///
/// Dropping the handle ends the incoming stream, as if the peer went away.
pub(crate) struct MockHandle {
    peer: MockPeer,
    state: Arc<MockState>,
}

/// Sending side of the mock's incoming stream.
///
/// The stream ends once the handle and every peer clone are dropped.
#[derive(Clone)]
pub(crate) struct MockPeer {
    incoming: mpsc::UnboundedSender<StdResult<Message, WsError>>,
}

impl MockPeer {
    /// Delivers `message` to the reader.
    pub(crate) fn push(&self, message: Message) {
        let _ = self.incoming.send(Ok(message));
    }
}

impl MockTransport {
    pub(crate) fn new() -> (Self, MockHandle) {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let state = Arc::new(MockState::default());

        (
            Self {
                incoming: incoming_rx,
                state: Arc::clone(&state),
            },
            MockHandle {
                peer: MockPeer {
                    incoming: incoming_tx,
                },
                state,
            },
        )
    }
}

impl MockHandle {
    /// Delivers `message` to the reader.
    pub(crate) fn push(&self, message: Message) {
        self.peer.push(message);
    }

    /// Returns a clone of the incoming side.
    pub(crate) fn peer(&self) -> MockPeer {
        self.peer.clone()
    }

    /// Runs `hook` after every written message, control frames included.
    pub(crate) fn on_write(&self, hook: impl Fn(&Message) + Send + Sync + 'static) {
        *self.state.on_write.lock() = Some(Box::new(hook));
    }

    /// Makes every following write fail.
    pub(crate) fn fail_writes(&self) {
        self.state.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes every following write hang.
    pub(crate) fn stall(&self) {
        self.state.stalled.store(true, Ordering::SeqCst);
    }

    /// Messages written so far, control frames included.
    pub(crate) fn sent(&self) -> Vec<Message> {
        self.state.sent.lock().clone()
    }

    /// Application messages written so far.
    pub(crate) fn sent_data(&self) -> Vec<Message> {
        self.sent()
            .into_iter()
            .filter(|message| message.is_text() || message.is_binary())
            .collect()
    }

    /// Number of keep-alive probes written so far.
    pub(crate) fn pings(&self) -> usize {
        self.sent().iter().filter(|message| message.is_ping()).count()
    }

    /// Number of times the transport was closed.
    pub(crate) fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Waits until `ready` holds for the written messages.
    pub(crate) async fn wait_until(&self, ready: impl Fn(&[Message]) -> bool) -> Vec<Message> {
        loop {
            let written = self.state.written.notified();
            {
                let sent = self.state.sent.lock();
                if ready(&sent) {
                    return sent.clone();
                }
            }
            written.await;
        }
    }
}

impl Stream for MockTransport {
    type Item = StdResult<Message, WsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.incoming.poll_recv(cx)
    }
}

impl Sink<Message> for MockTransport {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<StdResult<(), WsError>> {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Poll::Ready(Err(WsError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failure",
            ))));
        }
        if self.state.stalled.load(Ordering::SeqCst) {
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> StdResult<(), WsError> {
        if let Some(hook) = self.state.on_write.lock().as_ref() {
            hook(&item);
        }
        self.state.sent.lock().push(item);
        self.state.written.notify_waiters();
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<StdResult<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<StdResult<(), WsError>> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}
