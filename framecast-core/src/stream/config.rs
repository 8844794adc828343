//! Transport and encoder configuration.
//!
//! [`TransportConfig`] is validated once in [`TransportConfigBuilder::build`]
//! and immutable afterwards. [`EncoderPolicy`] holds the tunable constants of
//! the adaptive quality/scale search.

use std::time::Duration;

use crate::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────

/// Largest UDP payload over IPv4: 65535 − 8 (UDP) − 20 (IP).
pub const MAX_UDP_PAYLOAD: usize = 65_507;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_INITIAL_QUALITY: u8 = 80;
pub const DEFAULT_MIN_QUALITY: u8 = 20;
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

// ── TransportConfig ──────────────────────────────────────────────

/// Endpoint, datagram ceiling and quality bounds for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    host: String,
    port: u16,
    max_datagram_size: usize,
    initial_quality: u8,
    min_quality: u8,
    target_size: Option<(u32, u32)>,
    receive_timeout: Duration,
}

impl TransportConfig {
    /// Start a builder targeting `host:port` with default limits.
    pub fn builder(host: impl Into<String>, port: u16) -> TransportConfigBuilder {
        TransportConfigBuilder {
            config: TransportConfig {
                host: host.into(),
                port,
                ..Self::default()
            },
        }
    }

    /// Remote host name or IP literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote UDP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Hard ceiling for one outbound payload and the inbound read buffer.
    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// Quality every search starts (and restarts) from.
    pub fn initial_quality(&self) -> u8 {
        self.initial_quality
    }

    /// Lowest quality the search will try at any scale.
    pub fn min_quality(&self) -> u8 {
        self.min_quality
    }

    /// Fixed `(width, height)` applied to every frame before the search.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.target_size
    }

    /// How long `receive` waits. `Duration::ZERO` means a single poll.
    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            max_datagram_size: MAX_UDP_PAYLOAD,
            initial_quality: DEFAULT_INITIAL_QUALITY,
            min_quality: DEFAULT_MIN_QUALITY,
            target_size: None,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

// ── TransportConfigBuilder ───────────────────────────────────────

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.config.max_datagram_size = size;
        self
    }

    pub fn initial_quality(mut self, quality: u8) -> Self {
        self.config.initial_quality = quality;
        self
    }

    pub fn min_quality(mut self, quality: u8) -> Self {
        self.config.min_quality = quality;
        self
    }

    /// Set both quality bounds at once.
    pub fn quality_range(self, min: u8, initial: u8) -> Self {
        self.min_quality(min).initial_quality(initial)
    }

    pub fn target_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.config.target_size = size;
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<TransportConfig, ConfigError> {
        let c = self.config;
        if c.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if !(1..=100).contains(&c.initial_quality) {
            return Err(ConfigError::QualityOutOfRange {
                field: "initial_quality",
                value: c.initial_quality,
            });
        }
        if !(1..=100).contains(&c.min_quality) {
            return Err(ConfigError::QualityOutOfRange {
                field: "min_quality",
                value: c.min_quality,
            });
        }
        if c.min_quality > c.initial_quality {
            return Err(ConfigError::MinAboveInitial {
                min: c.min_quality,
                initial: c.initial_quality,
            });
        }
        if let Some((width, height)) = c.target_size {
            if width == 0 || height == 0 {
                return Err(ConfigError::EmptyTargetSize { width, height });
            }
        }
        Ok(c)
    }
}

// ── EncoderPolicy ────────────────────────────────────────────────

/// Tunable constants of the adaptive search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderPolicy {
    /// Quality decrement between inner-loop attempts.
    pub quality_step: u8,
    /// Factor applied to the cumulative scale after each exhausted
    /// quality sweep (0 < decay < 1).
    pub scale_decay: f32,
    /// The search gives up once the scale drops to or below this value.
    pub scale_floor: f32,
}

impl EncoderPolicy {
    /// Reject constants that would stall or never shrink the search.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality_step == 0 {
            return Err(ConfigError::InvalidPolicy("quality_step must be positive"));
        }
        if !(self.scale_decay > 0.0 && self.scale_decay < 1.0) {
            return Err(ConfigError::InvalidPolicy(
                "scale_decay must be strictly between 0 and 1",
            ));
        }
        if !(self.scale_floor.is_finite() && self.scale_floor > 0.0) {
            return Err(ConfigError::InvalidPolicy("scale_floor must be positive"));
        }
        Ok(())
    }
}

impl Default for EncoderPolicy {
    fn default() -> Self {
        Self {
            quality_step: 5,
            scale_decay: 0.8,
            scale_floor: 0.3,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
