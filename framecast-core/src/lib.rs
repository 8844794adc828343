//! # framecast-core
//!
//! Adaptive frame transport for remote object detection.
//!
//! This crate contains:
//! - **Stream**: `AdaptiveEncoder`, `DatagramTransport`, `TelemetryTracker`
//!   and the `InferenceClient` pipeline that ties them together
//! - **Sources and rendering**: `FrameSource` implementations and the
//!   `BoxRenderer` overlay
//! - **Protocol**: the JSON prediction reply format
//! - **Error**: `CastError`, a typed, `thiserror`-based error hierarchy

pub mod error;
pub mod protocol;
pub mod stream;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::{CastError, ConfigError};
pub use protocol::{Prediction, PredictionReply, parse_predictions, summarize};
pub use stream::{
    AdaptiveEncoder, BoxRenderer, ClientMetrics, CycleReport, DatagramTransport, EncodedPayload,
    EncoderPolicy, Frame, FrameSource, ImageCodec, ImageSequenceSource, InferenceClient,
    JpegCodec, MetricsSample, MetricsSnapshot, ReplyStatus, ResultRenderer, SentFrame,
    TelemetryTracker, TestPatternSource, TransportConfig,
};
