//! Single-datagram UDP transport.
//!
//! One encoded frame goes out as exactly one datagram with no header,
//! sequence number or framing. Replies are read one datagram at a time
//! within the configured receive timeout. Nothing correlates a reply with
//! the frame that caused it: whatever arrives next is returned.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──connect()──► connected ──close()──► closed
//!                      │  ▲
//!                send / receive
//! ```
//!
//! `send` and `receive` outside the connected state fail with
//! [`CastError::NotConnected`]. `close` is always safe.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, trace, warn};

use crate::error::CastError;
use crate::stream::config::TransportConfig;

// ── DatagramTransport ────────────────────────────────────────────

/// Connectionless UDP endpoint targeting one inference server.
#[derive(Debug)]
pub struct DatagramTransport {
    config: TransportConfig,
    socket: Option<UdpSocket>,
    remote_addr: Option<SocketAddr>,
    recv_buf: Vec<u8>,
}

impl DatagramTransport {
    /// Create an unconnected transport. No socket is opened yet.
    pub fn new(config: TransportConfig) -> Self {
        let recv_buf = vec![0u8; config.max_datagram_size()];
        Self {
            config,
            socket: None,
            remote_addr: None,
            recv_buf,
        }
    }

    /// Resolve the server address and bind an ephemeral local socket.
    ///
    /// IPv4 addresses are preferred when the host resolves to both
    /// families. Calling this while connected does nothing.
    pub async fn connect(&mut self) -> Result<(), CastError> {
        if self.socket.is_some() {
            debug!("transport already connected; ignoring connect");
            return Ok(());
        }

        let host = self.config.host();
        let port = self.config.port();
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(CastError::SocketCreate)?
            .collect();
        let remote = candidates
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| {
                CastError::SocketCreate(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{host}:{port} did not resolve to any address"),
                ))
            })?;

        let bind_addr: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(CastError::SocketCreate)?;

        info!(
            local = ?socket.local_addr().ok(),
            remote = %remote,
            max_datagram = self.config.max_datagram_size(),
            "UDP transport ready"
        );
        self.socket = Some(socket);
        self.remote_addr = Some(remote);
        Ok(())
    }

    /// Send `payload` as one datagram to the server.
    ///
    /// Payloads above the datagram ceiling are rejected before touching
    /// the socket. Returns the number of bytes written.
    pub async fn send(&self, payload: &[u8]) -> Result<usize, CastError> {
        let (socket, remote) = self.endpoint()?;

        let max = self.config.max_datagram_size();
        if payload.len() > max {
            warn!(size = payload.len(), max, "refusing oversized datagram");
            return Err(CastError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let sent = socket
            .send_to(payload, remote)
            .await
            .map_err(CastError::Send)?;
        trace!(bytes = sent, %remote, "datagram sent");
        Ok(sent)
    }

    /// Receive at most one datagram of at most `max_datagram_size` bytes.
    ///
    /// Waits up to the configured receive timeout; a zero timeout makes a
    /// single non-blocking attempt. [`CastError::ReceiveTimeout`] leaves
    /// the transport usable.
    pub async fn receive(&mut self) -> Result<Bytes, CastError> {
        let timeout = self.config.receive_timeout();
        let socket = self.socket.as_ref().ok_or(CastError::NotConnected)?;
        let buf = &mut self.recv_buf;

        let result = if timeout.is_zero() {
            match socket.try_recv_from(buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    trace!("no datagram pending");
                    return Err(CastError::ReceiveTimeout(timeout));
                }
                other => other,
            }
        } else {
            match tokio::time::timeout(timeout, socket.recv_from(buf)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(?timeout, "receive timed out");
                    return Err(CastError::ReceiveTimeout(timeout));
                }
            }
        };

        match result {
            Ok((len, from)) => {
                trace!(bytes = len, %from, "datagram received");
                Ok(Bytes::copy_from_slice(&buf[..len]))
            }
            Err(e) => {
                error!("UDP receive failed: {e}");
                Err(CastError::Receive(e))
            }
        }
    }

    /// Release the socket. Safe to call in any state.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            info!(local = ?socket.local_addr().ok(), "UDP transport closed");
        }
        self.remote_addr = None;
    }

    /// Whether a socket is currently held.
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Local address of the bound socket, if connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// The resolved server address, if connected.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn endpoint(&self) -> Result<(&UdpSocket, SocketAddr), CastError> {
        match (&self.socket, self.remote_addr) {
            (Some(socket), Some(remote)) => Ok((socket, remote)),
            _ => Err(CastError::NotConnected),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
