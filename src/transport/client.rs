//! Outbound dial.
//!
//! Validates the address, performs the handshake with any extra request
//! headers, and starts a [`Socket`] over the established connection.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::timeout;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pump::Socket;

use super::ws_config;

// ============================================================================
// DialConfig
// ============================================================================

/// Settings for outbound connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialConfig {
    /// Configuration of the resulting socket.
    pub socket: Config,
    /// Extra handshake request headers, sent in order.
    pub headers: Vec<(String, String)>,
    /// Bound on connect plus handshake; `None` waits indefinitely.
    pub handshake_timeout: Option<Duration>,
}

impl DialConfig {
    /// Creates a configuration with default socket settings and no headers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the socket configuration.
    #[inline]
    #[must_use]
    pub fn with_socket(mut self, socket: Config) -> Self {
        self.socket = socket;
        self
    }

    /// Adds a handshake request header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Bounds connect plus handshake.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// connect
// ============================================================================

/// Dials `address` (`ws://` or `wss://`) and starts a socket.
///
/// # Errors
///
/// - [`Error::DialFailed`] if the address is invalid, a header is
///   malformed, the peer is unreachable, or the handshake is rejected
/// - [`Error::Config`] if the socket configuration is invalid
pub async fn connect(address: &str, config: &DialConfig) -> Result<Socket> {
    config.socket.validate()?;

    let url = Url::parse(address)
        .map_err(|e| Error::dial_failed(format!("invalid address {address}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(Error::dial_failed(format!("unsupported scheme: {other}"))),
    }

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::dial_failed(e.to_string()))?;

    for (name, value) in &config.headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::dial_failed(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::dial_failed(format!("invalid value for header {name}: {e}")))?;
        request.headers_mut().append(header, value);
    }

    debug!(%url, headers = config.headers.len(), "Dialing");

    let handshake = connect_async_with_config(request, Some(ws_config(&config.socket)), false);

    let connected = match config.handshake_timeout {
        Some(limit) => timeout(limit, handshake).await.map_err(|_| {
            Error::dial_failed(format!("handshake timed out after {}ms", limit.as_millis()))
        })?,
        None => handshake.await,
    };

    let (ws_stream, response) = connected.map_err(handshake_error)?;

    let socket = Socket::open(ws_stream, config.socket.clone())?;
    info!(%url, status = %response.status(), conn = %socket.id(), "WebSocket connection established");

    Ok(socket)
}

/// Describes a failed handshake, including the body of a rejection.
fn handshake_error(error: WsError) -> Error {
    match error {
        WsError::Http(response) => {
            let status = response.status();
            let body = response
                .body()
                .as_ref()
                .map(|body| String::from_utf8_lossy(body.as_ref()).into_owned())
                .unwrap_or_default();

            if body.is_empty() {
                Error::dial_failed(format!("handshake rejected with {status}"))
            } else {
                Error::dial_failed(format!("handshake rejected with {status}: {body}"))
            }
        }
        other => Error::dial_failed(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_config_builder() {
        let config = DialConfig::new()
            .with_header("Origin", "https://app.example.com")
            .with_header("Authorization", "Bearer token")
            .with_handshake_timeout(Duration::from_secs(2));

        assert_eq!(config.headers.len(), 2);
        assert_eq!(config.headers[0].0, "Origin");
        assert_eq!(config.handshake_timeout, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_address() {
        let err = connect("not a url", &DialConfig::new()).await.err().expect("must fail");
        assert!(matches!(err, Error::DialFailed { .. }));
    }

    #[tokio::test]
    async fn test_connect_rejects_http_scheme() {
        let err = connect("http://127.0.0.1:1/", &DialConfig::new())
            .await
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_header() {
        let config = DialConfig::new().with_header("Bad Header", "value");
        let err = connect("ws://127.0.0.1:1/", &config).await.err().expect("must fail");
        assert!(err.to_string().contains("invalid header name"));
    }

    #[tokio::test]
    async fn test_connect_unreachable_peer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("bound address");
        drop(listener);

        let err = connect(&format!("ws://{addr}"), &DialConfig::new())
            .await
            .err()
            .expect("must fail");
        assert!(matches!(err, Error::DialFailed { .. }));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = DialConfig::new().with_socket(Config::new().with_outbound_capacity(0));
        let err = connect("ws://127.0.0.1:1/", &config).await.err().expect("must fail");
        assert!(matches!(err, Error::Config { .. }));
    }
}
