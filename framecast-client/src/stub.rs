//! Stand-in inference server for local testing.
//!
//! Answers every datagram it receives with the same predictions document,
//! regardless of content. Useful for exercising the client without a real
//! detector.

use std::io;
use std::net::SocketAddr;

use framecast_core::stream::config::MAX_UDP_PAYLOAD;
use framecast_core::{Prediction, PredictionReply};
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed reply: one centred person and one car in the lower left.
pub fn default_reply() -> PredictionReply {
    PredictionReply {
        predictions: vec![
            Prediction {
                x: 0.5,
                y: 0.5,
                width: 0.3,
                height: 0.6,
                class_name: "person".into(),
                confidence: 0.92,
            },
            Prediction {
                x: 0.2,
                y: 0.75,
                width: 0.25,
                height: 0.2,
                class_name: "car".into(),
                confidence: 0.81,
            },
        ],
    }
}

/// A bound stub server.
pub struct StubServer {
    socket: UdpSocket,
    reply: Vec<u8>,
}

impl StubServer {
    /// Bind to `addr` with the [`default_reply`].
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(addr).await?,
            reply: default_reply().to_bytes(),
        })
    }

    /// Reply with `reply` instead of the default document.
    pub fn with_reply(mut self, reply: Vec<u8>) -> Self {
        self.reply = reply;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answer datagrams until `cancel` fires. Returns the number answered.
    ///
    /// Socket errors on either direction are logged and skipped.
    pub async fn serve(self, cancel: CancellationToken) -> u64 {
        info!(addr = ?self.socket.local_addr().ok(), "stub inference server listening");
        let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
        let mut answered: u64 = 0;

        loop {
            let (len, from) = tokio::select! {
                _ = cancel.cancelled() => break,
                recv = self.socket.recv_from(&mut buf) => match recv {
                    Ok(r) => r,
                    Err(e) => {
                        // ICMP errors from a vanished client surface here.
                        warn!("stub receive failed: {e}");
                        continue;
                    }
                },
            };
            debug!(bytes = len, %from, "frame received");
            match self.socket.send_to(&self.reply, from).await {
                Ok(_) => answered += 1,
                Err(e) => warn!(%from, "stub reply failed: {e}"),
            }
        }

        info!(answered, "stub inference server stopped");
        answered
    }
}

// ── Tests ────────────────────────────────────────────────────────
