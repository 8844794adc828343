//! Shared frame and payload types for the streaming pipeline.
//!
//! [`Frame`] is the raw image handed from a frame source to the encoder.
//! [`EncodedPayload`] is the single-datagram result of the adaptive search.
//! Neither is retained across cycles.

use bytes::Bytes;
use image::RgbImage;

use crate::error::CastError;

/// Channels per pixel. Frames are always packed RGB8.
pub const CHANNELS: usize = 3;

// ── Frame ────────────────────────────────────────────────────────

/// A raw, uncompressed RGB8 frame.
///
/// The pixel buffer holds `height` tightly packed rows of
/// `width * 3` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap a raw RGB8 buffer.
    ///
    /// Fails if either dimension is zero or `data.len()` does not equal
    /// `width * height * 3`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CastError> {
        if width == 0 || height == 0 {
            return Err(CastError::InvalidFrame(format!(
                "zero dimension: {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(CastError::InvalidFrame(format!(
                "buffer length {} does not match {width}x{height}x{CHANNELS} = {expected}",
                data.len()
            )));
        }
        RgbImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| CastError::InvalidFrame("buffer rejected by image layout".into()))
    }

    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, image::Rgb(rgb)),
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Size of the uncompressed buffer in bytes.
    pub fn raw_len(&self) -> usize {
        self.width() as usize * self.height() as usize * CHANNELS
    }

    /// The packed pixel bytes.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self { image }
    }
}

// ── EncodedPayload ───────────────────────────────────────────────

/// A compressed frame that fits in one datagram.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// Codec output, at most `max_datagram_size` bytes.
    pub data: Bytes,
    /// Quality the payload was produced at.
    pub quality: u8,
    /// Cumulative scale factor reached by the search (1.0 = no fallback
    /// downscaling).
    pub scale: f32,
    /// Width of the encoded image in pixels.
    pub width: u32,
    /// Height of the encoded image in pixels.
    pub height: u32,
}

impl EncodedPayload {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
