//! Upgrade of incoming connections.
//!
//! The handshake itself is done by `tokio-tungstenite`; this module applies
//! the [`OriginPolicy`] during the upgrade and hands the connection to a
//! [`Socket`].
//!
//! # Connection Flow
//!
//! 1. [`Listener::bind`] binds a TCP listener (port 0 picks a free port)
//! 2. A peer connects to [`Listener::ws_url`]
//! 3. [`Listener::accept`] accepts the TCP connection and upgrades it
//! 4. The returned [`Socket`] is already pumping

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::http::header::{HOST, ORIGIN};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pump::Socket;

use super::ws_config;

// ============================================================================
// OriginPolicy
// ============================================================================

/// Decides which `Origin` headers may upgrade.
///
/// Requests without an `Origin` header come from non-browser clients and are
/// accepted by every policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept any origin.
    #[default]
    Any,
    /// Accept only the listed origins (e.g. `https://app.example.com`).
    AllowList(Vec<String>),
    /// Accept origins whose host matches the request's `Host` header.
    SameHost,
}

impl OriginPolicy {
    /// Returns `true` if a request with these headers may upgrade.
    #[must_use]
    pub fn allows(&self, origin: Option<&str>, host: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };

        match self {
            Self::Any => true,
            Self::AllowList(allowed) => allowed
                .iter()
                .any(|entry| entry.trim_end_matches('/').eq_ignore_ascii_case(origin)),
            Self::SameHost => {
                let Some(host) = host else {
                    return false;
                };
                origin_authority(origin).is_some_and(|authority| authority.eq_ignore_ascii_case(host))
            }
        }
    }
}

/// Extracts `host[:port]` from an origin URL.
fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;

    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

// ============================================================================
// AcceptConfig
// ============================================================================

/// Settings for server-side upgrades.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptConfig {
    /// Configuration of the resulting socket.
    pub socket: Config,
    /// Origin check applied during the upgrade.
    pub origin: OriginPolicy,
    /// Bound on the handshake; `None` waits indefinitely.
    pub handshake_timeout: Option<Duration>,
}

impl AcceptConfig {
    /// Creates a permissive configuration with default socket settings.
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

    /// Sets the origin policy.
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: OriginPolicy) -> Self {
        self.origin = origin;
        self
    }

    /// Bounds the handshake duration.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// accept
// ============================================================================

/// Upgrades an accepted byte stream and starts a socket over it.
///
/// # Errors
///
/// - [`Error::UpgradeFailed`] if the handshake fails, times out, or the
///   origin is rejected
/// - [`Error::Config`] if the socket configuration is invalid
pub async fn accept<S>(stream: S, config: &AcceptConfig) -> Result<Socket>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    config.socket.validate()?;

    let policy = config.origin.clone();
    let check_origin = move |request: &Request, response: Response| -> StdResult<Response, ErrorResponse> {
        let headers = request.headers();
        let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
        let host = headers.get(HOST).and_then(|value| value.to_str().ok());

        if policy.allows(origin, host) {
            return Ok(response);
        }

        warn!(?origin, ?host, "Rejected upgrade from disallowed origin");
        let mut rejection = ErrorResponse::new(Some("origin not allowed".to_owned()));
        *rejection.status_mut() = StatusCode::FORBIDDEN;
        Err(rejection)
    };

    let handshake =
        accept_hdr_async_with_config(stream, check_origin, Some(ws_config(&config.socket)));

    let upgraded = match config.handshake_timeout {
        Some(limit) => timeout(limit, handshake).await.map_err(|_| {
            Error::upgrade_failed(format!("handshake timed out after {}ms", limit.as_millis()))
        })?,
        None => handshake.await,
    };

    let ws_stream = upgraded.map_err(|e| Error::upgrade_failed(e.to_string()))?;

    Socket::open(ws_stream, config.socket.clone())
}

// ============================================================================
// Listener
// ============================================================================

/// A TCP listener that upgrades every accepted connection.
///
/// # Example
///
/// ```ignore
/// use websocket_pump::transport::{AcceptConfig, Listener};
///
/// let listener = Listener::bind("127.0.0.1:0", AcceptConfig::new()).await?;
/// println!("listening on {}", listener.ws_url());
///
/// let (mut socket, peer) = listener.accept().await?;
/// ```
pub struct Listener {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
    /// Upgrade settings.
    config: AcceptConfig,
}

impl Listener {
    /// Binds to `addr`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if binding fails
    /// - [`Error::Config`] if the socket configuration is invalid
    pub async fn bind(addr: impl ToSocketAddrs, config: AcceptConfig) -> Result<Self> {
        config.socket.validate()?;

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "WebSocket listener bound");

        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL for this listener.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Accepts one connection and upgrades it.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if accepting the TCP connection fails
    /// - [`Error::UpgradeFailed`] if the upgrade fails
    pub async fn accept(&self) -> Result<(Socket, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(%peer, "TCP connection accepted");

        let socket = accept(stream, &self.config).await?;
        info!(%peer, conn = %socket.id(), "WebSocket connection established");

        Ok((socket, peer))
    }
}

// ============================================================================
// Tests
// ============================================================================
