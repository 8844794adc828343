//! Configuration for the framecast client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use framecast_core::error::ConfigError;
use framecast_core::stream::config::{
    DEFAULT_HOST, DEFAULT_INITIAL_QUALITY, DEFAULT_MIN_QUALITY, DEFAULT_PORT, MAX_UDP_PAYLOAD,
};
use framecast_core::{EncoderPolicy, TransportConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Inference server endpoint and datagram limits.
    pub network: NetworkConfig,
    /// Adaptive encoder bounds and policy.
    pub encoder: EncoderConfig,
    /// Where frames come from.
    pub source: SourceConfig,
    /// Where annotated frames and metrics go.
    pub output: OutputConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Inference server host name or IP.
    pub host: String,
    /// Inference server UDP port (also the stub server's bind port).
    pub port: u16,
    /// Largest datagram sent or received, in bytes.
    pub max_datagram_size: usize,
    /// How long to wait for a reply per frame, in milliseconds.
    pub receive_timeout_ms: u64,
}

/// Encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// JPEG quality each search starts from.
    pub initial_quality: u8,
    /// Lowest JPEG quality tried.
    pub min_quality: u8,
    /// Resize every frame to this width first (0 = keep source size).
    pub target_width: u32,
    /// Resize every frame to this height first (0 = keep source size).
    pub target_height: u32,
    /// Quality decrement per attempt.
    pub quality_step: u8,
    /// Scale multiplier applied after each failed quality sweep.
    pub scale_decay: f32,
    /// Scale at or below which the search gives up.
    pub scale_floor: f32,
}

/// Kind of frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Synthetic moving gradient.
    Pattern,
    /// Directory of JPEG/PNG files.
    Images,
}

/// Frame source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Image directory (for `kind = "images"`).
    pub dir: PathBuf,
    /// Restart the image sequence at the end.
    pub looping: bool,
    /// Test pattern width.
    pub width: u32,
    /// Test pattern height.
    pub height: u32,
    /// Stop after this many frames (0 = until the source ends).
    pub frames: u64,
    /// Frame rate cap (0 = as fast as possible).
    pub target_fps: u32,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for annotated JPEG frames and the final `metrics.json`.
    /// If empty, nothing is written.
    pub dir: PathBuf,
    /// Log the metrics table every N frames (0 = only at exit).
    pub metrics_every: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            max_datagram_size: MAX_UDP_PAYLOAD,
            receive_timeout_ms: 100,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        let policy = EncoderPolicy::default();
        Self {
            initial_quality: DEFAULT_INITIAL_QUALITY,
            min_quality: DEFAULT_MIN_QUALITY,
            target_width: 0,
            target_height: 0,
            quality_step: policy.quality_step,
            scale_decay: policy.scale_decay,
            scale_floor: policy.scale_floor,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Pattern,
            dir: PathBuf::new(),
            looping: false,
            width: 640,
            height: 480,
            frames: 0,
            target_fps: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            metrics_every: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Build the validated transport settings.
    pub fn to_transport_config(&self) -> Result<TransportConfig, ConfigError> {
        let target = match (self.encoder.target_width, self.encoder.target_height) {
            (0, 0) => None,
            (w, h) => Some((w, h)),
        };
        TransportConfig::builder(self.network.host.clone(), self.network.port)
            .max_datagram_size(self.network.max_datagram_size)
            .quality_range(self.encoder.min_quality, self.encoder.initial_quality)
            .target_size(target)
            .receive_timeout(Duration::from_millis(self.network.receive_timeout_ms))
            .build()
    }

    /// Build the validated encoder policy.
    pub fn to_encoder_policy(&self) -> Result<EncoderPolicy, ConfigError> {
        let policy = EncoderPolicy {
            quality_step: self.encoder.quality_step,
            scale_decay: self.encoder.scale_decay,
            scale_floor: self.encoder.scale_floor,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Output directory, if one is configured.
    pub fn output_dir(&self) -> Option<&Path> {
        (!self.output.dir.as_os_str().is_empty()).then_some(self.output.dir.as_path())
    }
}

// ── Tests ────────────────────────────────────────────────────────
