//! Domain-specific error types for the framecast pipeline.
//!
//! Every fallible operation returns `Result<T, CastError>`. Failures are
//! reported as values; the orchestrator decides per variant whether a cycle
//! can be skipped or the stream must stop (see [`CastError::is_skippable`]).

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for framecast.
#[derive(Debug, Error)]
pub enum CastError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The UDP socket could not be created or the remote endpoint could
    /// not be resolved.
    #[error("failed to create UDP socket: {0}")]
    SocketCreate(#[source] std::io::Error),

    /// `send` / `receive` was called before `connect` or after `close`.
    #[error("transport is not connected")]
    NotConnected,

    /// The OS rejected the outbound datagram.
    #[error("datagram send failed: {0}")]
    Send(#[source] std::io::Error),

    /// No datagram arrived within the receive window. Expected under
    /// normal operation.
    #[error("no reply within {0:?}")]
    ReceiveTimeout(Duration),

    /// The socket reported an unexpected receive failure.
    #[error("datagram receive failed: {0}")]
    Receive(#[source] std::io::Error),

    // ── Encoding Errors ──────────────────────────────────────────
    /// The image codec itself failed.
    #[error("image encoding failed: {0}")]
    Encode(String),

    /// The payload does not fit in one datagram. Raised by the encoder
    /// when the quality/scale search is exhausted and by the transport
    /// when handed an oversized payload.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Frame Errors ─────────────────────────────────────────────
    /// A raw buffer did not match its declared dimensions.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A frame source failed to produce the next frame.
    #[error("frame source error: {0}")]
    Source(String),

    /// Filesystem or other local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value was rejected at construction time.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl CastError {
    /// Whether the streaming loop may log this error and carry on with the
    /// next frame.
    ///
    /// Encoding, send and receive failures only cost the current frame.
    /// A disconnected transport, a broken frame source or bad
    /// configuration end the stream.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            CastError::ReceiveTimeout(_)
                | CastError::Receive(_)
                | CastError::Send(_)
                | CastError::Encode(_)
                | CastError::PayloadTooLarge { .. }
        )
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Validation failures for [`TransportConfig`](crate::stream::TransportConfig)
/// and [`EncoderPolicy`](crate::stream::EncoderPolicy).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The remote host string was empty.
    #[error("host must not be empty")]
    EmptyHost,

    /// A quality value fell outside 1..=100.
    #[error("{field} must be within 1..=100, got {value}")]
    QualityOutOfRange { field: &'static str, value: u8 },

    /// `min_quality` was above `initial_quality`.
    #[error("min_quality ({min}) must not exceed initial_quality ({initial})")]
    MinAboveInitial { min: u8, initial: u8 },

    /// `target_size` had a zero dimension.
    #[error("target size must be positive, got {width}x{height}")]
    EmptyTargetSize { width: u32, height: u32 },

    /// An encoder policy constant was outside its usable range.
    #[error("invalid encoder policy: {0}")]
    InvalidPolicy(&'static str),
}
