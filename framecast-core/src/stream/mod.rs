//! # Adaptive frame streaming
//!
//! Sends camera-style frames to a remote inference server, one UDP datagram
//! per frame, and draws the detections that come back.
//!
//! ## Architecture
//!
//! ```text
//! CLIENT                                      INFERENCE SERVER
//! ┌─────────────────────────┐                ┌──────────────────────┐
//! │ FrameSource             │                │                      │
//! │   ↓                     │   JPEG / UDP   │                      │
//! │ AdaptiveEncoder         │ ──────────►    │ detector             │
//! │   ↓                     │                │   ↓                  │
//! │ DatagramTransport       │ ◄──────────    │ {"predictions": [..]}│
//! │   ↓                     │   JSON / UDP   │                      │
//! │ ResultRenderer          │                │                      │
//! │   ↓                     │                └──────────────────────┘
//! │ TelemetryTracker        │
//! └─────────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module       | Purpose                                          |
//! |------------- |--------------------------------------------------|
//! | `types`      | Raw frames and encoded payloads                   |
//! | `config`     | Transport configuration and encoder policy        |
//! | `encoder`    | Quality/scale search that fits one datagram       |
//! | `transport`  | Single-datagram UDP send and bounded receive      |
//! | `telemetry`  | Rolling compression and latency metrics           |
//! | `source`     | Frame sources (image sequences, test patterns)    |
//! | `font`       | 5×7 bitmap text for labels and overlays           |
//! | `render`     | Box and label overlays                            |
//! | `client`     | Per-frame pipeline orchestration                  |

pub mod client;
pub mod config;
pub mod encoder;
pub mod font;
pub mod render;
pub mod source;
pub mod telemetry;
pub mod transport;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use client::{ClientMetrics, CycleReport, InferenceClient, ReplyStatus, SentFrame};
pub use config::{EncoderPolicy, MAX_UDP_PAYLOAD, TransportConfig, TransportConfigBuilder};
pub use encoder::{AdaptiveEncoder, ImageCodec, JpegCodec};
pub use render::{BoxRenderer, ResultRenderer, class_color, draw_overlay};
pub use source::{FrameSource, ImageSequenceSource, TestPatternSource};
pub use telemetry::{MetricsSample, MetricsSnapshot, TelemetryTracker, WINDOW_CAPACITY};
pub use transport::DatagramTransport;
pub use types::{EncodedPayload, Frame};
