//! Adaptive single-datagram frame encoder.
//!
//! Fits a [`Frame`] into one datagram of at most
//! [`TransportConfig::max_datagram_size`] bytes:
//!
//! 1. Resize once to the configured target size, if any.
//! 2. Sweep quality downward from `initial_quality` to `min_quality` in
//!    steps of [`EncoderPolicy::quality_step`].
//! 3. If no quality fits, shrink the working image by the cumulative scale
//!    (`scale *= scale_decay`), restart the sweep at `initial_quality`, and
//!    repeat while `scale > scale_floor`.
//!
//! All search state is local to [`AdaptiveEncoder::encode`].

use std::borrow::Cow;

use bytes::Bytes;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use tracing::{debug, trace, warn};

use crate::error::{CastError, ConfigError};
use crate::stream::config::{EncoderPolicy, TransportConfig};
use crate::stream::types::{EncodedPayload, Frame};

/// Resampling filter for both the target resize and fallback downscaling.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

// ── ImageCodec ───────────────────────────────────────────────────

/// A lossy still-image codec driven by a single quality index.
pub trait ImageCodec {
    /// Compress `image` at `quality` (1..=100, higher = larger output).
    fn compress(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, CastError>;
}

/// Baseline JPEG via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn compress(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, CastError> {
        let mut buffer = Vec::new();
        // The JPEG quantiser is undefined at 0.
        JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
            .encode_image(image)
            .map_err(|e| CastError::Encode(format!("JPEG encode failed: {e}")))?;
        Ok(buffer)
    }
}

// ── AdaptiveEncoder ──────────────────────────────────────────────

/// Quality-then-scale search that fits frames into one datagram.
///
/// The encoder is stateless between calls; `encode` takes `&self` and never
/// mutates the [`TransportConfig`] it is given.
#[derive(Debug, Clone)]
pub struct AdaptiveEncoder<C = JpegCodec> {
    codec: C,
    policy: EncoderPolicy,
}

impl AdaptiveEncoder<JpegCodec> {
    /// JPEG encoder with the default policy.
    pub fn new() -> Self {
        Self {
            codec: JpegCodec,
            policy: EncoderPolicy::default(),
        }
    }

    /// JPEG encoder with a custom policy.
    pub fn with_policy(policy: EncoderPolicy) -> Result<Self, ConfigError> {
        Self::with_codec(JpegCodec, policy)
    }
}

impl Default for AdaptiveEncoder<JpegCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ImageCodec> AdaptiveEncoder<C> {
    /// Encoder over an arbitrary codec.
    pub fn with_codec(codec: C, policy: EncoderPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self { codec, policy })
    }

    pub fn policy(&self) -> &EncoderPolicy {
        &self.policy
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Compress `frame` so the result fits in one datagram.
    ///
    /// Returns [`CastError::PayloadTooLarge`] once the scale drops to the
    /// floor without a fit, carrying the smallest size observed. If the
    /// codec itself failed during the search, that failure is returned as
    /// [`CastError::Encode`] instead. A codec failure ends the current
    /// quality sweep immediately.
    pub fn encode(
        &self,
        frame: &Frame,
        config: &TransportConfig,
    ) -> Result<EncodedPayload, CastError> {
        let max = config.max_datagram_size();
        let initial = i16::from(config.initial_quality());
        let min = i16::from(config.min_quality());
        let step = i16::from(self.policy.quality_step);

        let mut working: Cow<'_, RgbImage> = match config.target_size() {
            Some((width, height)) => {
                Cow::Owned(imageops::resize(frame.image(), width, height, RESIZE_FILTER))
            }
            None => Cow::Borrowed(frame.image()),
        };

        let mut scale = 1.0f32;
        let mut smallest: Option<usize> = None;
        let mut codec_error: Option<CastError> = None;

        while scale > self.policy.scale_floor {
            let mut quality = initial;

            while quality >= min {
                // `min >= 1`, so the cast cannot wrap.
                let q = quality as u8;
                let data = match self.codec.compress(&working, q) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(quality = q, scale, "codec failure, abandoning quality sweep: {e}");
                        codec_error = Some(e);
                        break;
                    }
                };

                if data.len() <= max {
                    if q != config.initial_quality() || scale < 1.0 {
                        debug!(
                            quality = q,
                            scale,
                            width = working.width(),
                            height = working.height(),
                            size = data.len(),
                            "frame fitted after degradation"
                        );
                    }
                    return Ok(EncodedPayload {
                        width: working.width(),
                        height: working.height(),
                        data: Bytes::from(data),
                        quality: q,
                        scale,
                    });
                }

                trace!(quality = q, scale, size = data.len(), max, "payload over ceiling");
                smallest = Some(smallest.map_or(data.len(), |s| s.min(data.len())));
                quality -= step;
            }

            scale *= self.policy.scale_decay;
            // The last decay only ends the loop; skip its resize.
            if scale > self.policy.scale_floor {
                working = Cow::Owned(scale_down(&working, scale));
            }
        }

        match codec_error {
            Some(err) => Err(err),
            None => Err(CastError::PayloadTooLarge {
                size: smallest.unwrap_or(0),
                max,
            }),
        }
    }
}

/// Shrink `image` by `scale` from its current size, keeping at least 1×1.
fn scale_down(image: &RgbImage, scale: f32) -> RgbImage {
    let width = ((image.width() as f32) * scale).round().max(1.0) as u32;
    let height = ((image.height() as f32) * scale).round().max(1.0) as u32;
    imageops::resize(image, width, height, RESIZE_FILTER)
}

// ── Tests ────────────────────────────────────────────────────────
