//! Client-side streaming pipeline.
//!
//! Each cycle runs strictly in order:
//!
//! 1. [`FrameSource`] yields a raw frame.
//! 2. [`AdaptiveEncoder`] fits it into one datagram.
//! 3. [`DatagramTransport`] sends it and waits (bounded) for a reply.
//! 4. The reply is parsed and drawn by the [`ResultRenderer`].
//! 5. [`TelemetryTracker`] records the send.
//!
//! Skippable failures (see [`CastError::is_skippable`]) are logged and cost
//! only the current frame. Everything else ends the cycle with an error.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CastError;
use crate::protocol::prediction::{Prediction, parse_predictions};
use crate::stream::config::TransportConfig;
use crate::stream::encoder::{AdaptiveEncoder, ImageCodec, JpegCodec};
use crate::stream::render::{BoxRenderer, ResultRenderer};
use crate::stream::source::FrameSource;
use crate::stream::telemetry::{MetricsSample, MetricsSnapshot, TelemetryTracker};
use crate::stream::transport::DatagramTransport;
use crate::stream::types::Frame;

// ── Cycle results ────────────────────────────────────────────────

/// What went out on the wire for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentFrame {
    pub bytes: usize,
    pub quality: u8,
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

/// How the reply wait for one frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    /// A datagram arrived and was parsed (possibly to zero predictions).
    Received,
    /// Nothing arrived within the receive timeout.
    TimedOut,
    /// The socket reported a receive error.
    Failed,
    /// The frame was not sent, so no reply was awaited.
    Skipped,
}

/// Result of one pipeline cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The source frame, annotated when a reply was received.
    pub frame: Frame,
    /// Predictions decoded from the reply.
    pub predictions: Vec<Prediction>,
    /// `None` when encoding or sending was skipped.
    pub sent: Option<SentFrame>,
    pub reply: ReplyStatus,
}

// ── ClientMetrics ────────────────────────────────────────────────

/// Telemetry plus the description of the latest reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientMetrics {
    /// `None` until the first frame is sent.
    pub telemetry: Option<MetricsSnapshot>,
    /// `None` until the first reply arrives.
    pub prediction_summary: Option<String>,
}

impl ClientMetrics {
    /// Flat, key-ordered view for overlays and logs.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self
            .telemetry
            .as_ref()
            .map(MetricsSnapshot::to_map)
            .unwrap_or_default();
        if let Some(summary) = &self.prediction_summary {
            map.insert("prediction_summary".to_string(), summary.clone());
        }
        map
    }
}

// ── InferenceClient ──────────────────────────────────────────────

/// Streams frames from a source to a UDP inference server.
///
/// # Lifetime
///
/// Call [`start`](Self::start) to open the transport, then drive cycles
/// with [`process_frame`](Self::process_frame) or [`run`](Self::run).
/// [`stop`](Self::stop) releases the socket and is safe to call at any
/// point, including after a failed start.
pub struct InferenceClient<S, R = BoxRenderer, C = JpegCodec> {
    source: S,
    renderer: R,
    encoder: AdaptiveEncoder<C>,
    transport: DatagramTransport,
    telemetry: TelemetryTracker,
    latest_predictions: Option<Vec<Prediction>>,
    frame_interval: Option<Duration>,
    running: bool,
}

impl<S: FrameSource, R: ResultRenderer> InferenceClient<S, R, JpegCodec> {
    /// Client with the default JPEG encoder and no frame pacing.
    pub fn new(config: TransportConfig, source: S, renderer: R) -> Self {
        let telemetry = TelemetryTracker::new(config.initial_quality());
        Self {
            source,
            renderer,
            encoder: AdaptiveEncoder::new(),
            transport: DatagramTransport::new(config),
            telemetry,
            latest_predictions: None,
            frame_interval: None,
            running: false,
        }
    }
}

impl<S: FrameSource, R: ResultRenderer, C: ImageCodec> InferenceClient<S, R, C> {
    /// Replace the encoder (custom policy or codec).
    pub fn with_encoder<C2: ImageCodec>(self, encoder: AdaptiveEncoder<C2>) -> InferenceClient<S, R, C2> {
        InferenceClient {
            source: self.source,
            renderer: self.renderer,
            encoder,
            transport: self.transport,
            telemetry: self.telemetry,
            latest_predictions: self.latest_predictions,
            frame_interval: self.frame_interval,
            running: self.running,
        }
    }

    /// Cap [`run`](Self::run) at `fps` cycles per second (0 disables).
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(fps)));
        self
    }

    /// Open the transport. Does nothing if already running.
    pub async fn start(&mut self) -> Result<(), CastError> {
        if self.running {
            warn!("client is already running");
            return Ok(());
        }
        if let Err(e) = self.transport.connect().await {
            self.transport.close();
            return Err(e);
        }
        self.running = true;
        info!("inference client started");
        Ok(())
    }

    /// Close the transport. Does nothing if not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.transport.close();
        self.running = false;
        info!(
            frames_sent = self.telemetry.frames_sent_total(),
            bytes_sent = self.telemetry.bytes_sent_total(),
            "inference client stopped"
        );
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one capture → encode → send → receive → render cycle.
    ///
    /// Returns `Ok(None)` at end of stream.
    pub async fn process_frame(&mut self) -> Result<Option<CycleReport>, CastError> {
        if !self.running {
            return Err(CastError::NotConnected);
        }

        let Some(frame) = self.source.next_frame().await? else {
            info!("frame source exhausted");
            return Ok(None);
        };
        let raw_len = frame.raw_len();

        let started = Instant::now();
        let encoded = self.encoder.encode(&frame, self.transport.config());
        let encode_latency = started.elapsed();

        let mut report = CycleReport {
            frame,
            predictions: Vec::new(),
            sent: None,
            reply: ReplyStatus::Skipped,
        };

        let payload = match encoded {
            Ok(payload) => payload,
            Err(e) if e.is_skippable() => {
                warn!("frame not sent: {e}");
                return Ok(Some(report));
            }
            Err(e) => return Err(e),
        };

        match self.transport.send(&payload.data).await {
            Ok(bytes) => {
                self.telemetry
                    .record(MetricsSample::new(payload.len(), raw_len, encode_latency));
                report.sent = Some(SentFrame {
                    bytes,
                    quality: payload.quality,
                    scale: payload.scale,
                    width: payload.width,
                    height: payload.height,
                });
            }
            Err(e) if e.is_skippable() => {
                warn!("failed to send frame: {e}");
                return Ok(Some(report));
            }
            Err(e) => return Err(e),
        }

        match self.transport.receive().await {
            Ok(data) => {
                let predictions = parse_predictions(&data);
                debug!("{}", self.renderer.summarize(&predictions));
                report.frame = self.renderer.annotate(report.frame, &predictions);
                report.reply = ReplyStatus::Received;
                self.latest_predictions = Some(predictions.clone());
                report.predictions = predictions;
            }
            Err(CastError::ReceiveTimeout(_)) => {
                debug!("no predictions received");
                report.reply = ReplyStatus::TimedOut;
            }
            Err(e) if e.is_skippable() => {
                report.reply = ReplyStatus::Failed;
            }
            Err(e) => return Err(e),
        }

        Ok(Some(report))
    }

    /// Drive cycles until end of stream or `cancel` fires.
    ///
    /// Starts the client if needed. `sink` sees every cycle together with
    /// the metrics after it. Cancellation is checked between cycles and
    /// during frame pacing; an in-flight send/receive always completes.
    /// Returns the number of cycles run.
    pub async fn run<F>(&mut self, cancel: CancellationToken, mut sink: F) -> Result<u64, CastError>
    where
        F: FnMut(CycleReport, &ClientMetrics),
    {
        self.start().await?;
        let mut cycles: u64 = 0;

        while !cancel.is_cancelled() {
            let cycle_start = Instant::now();

            let Some(report) = self.process_frame().await? else {
                break;
            };
            cycles += 1;
            let metrics = self.metrics();
            sink(report, &metrics);

            if let Some(interval) = self.frame_interval {
                let elapsed = cycle_start.elapsed();
                if elapsed < interval {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(interval - elapsed) => {}
                    }
                }
            }
        }

        info!(cycles, "streaming loop finished");
        Ok(cycles)
    }

    /// Current telemetry and latest prediction summary.
    pub fn metrics(&self) -> ClientMetrics {
        ClientMetrics {
            telemetry: self.telemetry.snapshot(),
            prediction_summary: self
                .latest_predictions
                .as_deref()
                .map(|p| self.renderer.summarize(p)),
        }
    }

    /// Predictions from the most recent reply.
    pub fn latest_predictions(&self) -> Option<&[Prediction]> {
        self.latest_predictions.as_deref()
    }

    pub fn telemetry(&self) -> &TelemetryTracker {
        &self.telemetry
    }

    pub fn transport(&self) -> &DatagramTransport {
        &self.transport
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

// ── Tests ────────────────────────────────────────────────────────
