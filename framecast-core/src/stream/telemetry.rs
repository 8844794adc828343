//! Rolling per-frame telemetry.
//!
//! Keeps the most recent [`WINDOW_CAPACITY`] samples of encoded size,
//! compression ratio and encode latency in three independent FIFO rings,
//! plus two lifetime counters that never reset. Averages are computed over
//! the rings only.
//!
//! The tracker is single-writer. If capture and network I/O are ever split
//! across tasks, wrap it in a `Mutex` or feed it through a channel.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use serde::Serialize;

/// Samples retained per rolling window.
pub const WINDOW_CAPACITY: usize = 100;

// ── MetricsSample ────────────────────────────────────────────────

/// Measurements for one successfully sent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSample {
    /// Encoded payload length in bytes.
    pub encoded_size: usize,
    /// `encoded_size / raw_size` of the uncompressed frame.
    pub compression_ratio: f64,
    /// Wall time spent in the adaptive encoder.
    pub encode_latency: Duration,
}

impl MetricsSample {
    /// Build a sample, deriving the ratio from the raw frame size.
    pub fn new(encoded_size: usize, raw_size: usize, encode_latency: Duration) -> Self {
        let compression_ratio = if raw_size == 0 {
            0.0
        } else {
            encoded_size as f64 / raw_size as f64
        };
        Self {
            encoded_size,
            compression_ratio,
            encode_latency,
        }
    }
}

// ── MetricsSnapshot ──────────────────────────────────────────────

/// Aggregates over the current windows and lifetime totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Mean encoded size in bytes over the window.
    pub avg_frame_size: f64,
    /// Mean compression ratio over the window.
    pub avg_compression_ratio: f64,
    /// Mean encode latency over the window.
    #[serde(serialize_with = "serialize_millis")]
    pub avg_latency: Duration,
    /// Configured initial quality (not the quality of the last frame).
    pub current_quality: u8,
    /// Frames sent since the tracker was created.
    pub frames_sent_total: u64,
    /// Payload bytes sent since the tracker was created.
    pub bytes_sent_total: u64,
}

impl MetricsSnapshot {
    /// Human-readable key/value view, ordered by key.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "avg_frame_size".to_string(),
            format!("{:.0} B", self.avg_frame_size),
        );
        map.insert(
            "avg_compression_ratio".to_string(),
            format!("{:.4}", self.avg_compression_ratio),
        );
        map.insert(
            "avg_latency".to_string(),
            format!("{:.2} ms", self.avg_latency.as_secs_f64() * 1000.0),
        );
        map.insert(
            "current_quality".to_string(),
            self.current_quality.to_string(),
        );
        map.insert(
            "frames_sent_total".to_string(),
            self.frames_sent_total.to_string(),
        );
        map.insert(
            "bytes_sent_total".to_string(),
            self.bytes_sent_total.to_string(),
        );
        map
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

// ── TelemetryTracker ─────────────────────────────────────────────

/// Rolling-window telemetry for the send path.
#[derive(Debug, Clone)]
pub struct TelemetryTracker {
    sizes: VecDeque<usize>,
    ratios: VecDeque<f64>,
    latencies: VecDeque<Duration>,
    capacity: usize,
    configured_quality: u8,
    frames_sent_total: u64,
    bytes_sent_total: u64,
}

impl TelemetryTracker {
    /// Tracker with the standard window of [`WINDOW_CAPACITY`].
    pub fn new(configured_quality: u8) -> Self {
        Self::with_capacity(configured_quality, WINDOW_CAPACITY)
    }

    /// Tracker with a custom window size (at least 1).
    pub fn with_capacity(configured_quality: u8, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sizes: VecDeque::with_capacity(capacity),
            ratios: VecDeque::with_capacity(capacity),
            latencies: VecDeque::with_capacity(capacity),
            capacity,
            configured_quality,
            frames_sent_total: 0,
            bytes_sent_total: 0,
        }
    }

    /// Append one sample and bump the lifetime counters.
    pub fn record(&mut self, sample: MetricsSample) {
        push_bounded(&mut self.sizes, sample.encoded_size, self.capacity);
        push_bounded(&mut self.ratios, sample.compression_ratio, self.capacity);
        push_bounded(&mut self.latencies, sample.encode_latency, self.capacity);
        self.frames_sent_total += 1;
        self.bytes_sent_total += sample.encoded_size as u64;
    }

    /// Current aggregates, or `None` if nothing was ever recorded.
    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        if self.sizes.is_empty() {
            return None;
        }

        let avg_frame_size =
            self.sizes.iter().map(|&s| s as f64).sum::<f64>() / self.sizes.len() as f64;
        let avg_compression_ratio = self.ratios.iter().sum::<f64>() / self.ratios.len() as f64;
        let total_latency: Duration = self.latencies.iter().sum();
        let avg_latency = total_latency / self.latencies.len() as u32;

        Some(MetricsSnapshot {
            avg_frame_size,
            avg_compression_ratio,
            avg_latency,
            current_quality: self.configured_quality,
            frames_sent_total: self.frames_sent_total,
            bytes_sent_total: self.bytes_sent_total,
        })
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frames_sent_total(&self) -> u64 {
        self.frames_sent_total
    }

    pub fn bytes_sent_total(&self) -> u64 {
        self.bytes_sent_total
    }
}

fn push_bounded<T>(ring: &mut VecDeque<T>, value: T, capacity: usize) {
    if ring.len() == capacity {
        ring.pop_front();
    }
    ring.push_back(value);
}

// ── Tests ────────────────────────────────────────────────────────
