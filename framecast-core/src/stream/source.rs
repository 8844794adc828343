//! Frame sources.
//!
//! A [`FrameSource`] yields raw frames until it runs dry. Cameras and video
//! decoders live outside this crate; two sources ship here:
//!
//! - [`ImageSequenceSource`]: image files from a directory, in name order.
//! - [`TestPatternSource`]: synthetic moving gradients.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tracing::{debug, info};

use crate::error::CastError;
use crate::stream::types::Frame;

/// File extensions [`ImageSequenceSource`] picks up (case-insensitive).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

// ── FrameSource ──────────────────────────────────────────────────

/// Produces raw frames on demand.
#[async_trait]
pub trait FrameSource: Send {
    /// The next frame, or `None` at end of stream.
    async fn next_frame(&mut self) -> Result<Option<Frame>, CastError>;

    /// Dimensions of the frames produced so far, if known.
    fn frame_dimensions(&self) -> Option<(u32, u32)>;
}

// ── ImageSequenceSource ──────────────────────────────────────────

/// Plays back a directory of still images as a video stream.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    last_dimensions: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    /// Index every JPEG/PNG file directly inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CastError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)));
            if is_image && path.is_file() {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(CastError::Source(format!(
                "no images found in {}",
                dir.display()
            )));
        }
        paths.sort();
        info!(dir = %dir.display(), frames = paths.len(), "image sequence opened");

        Ok(Self {
            paths,
            cursor: 0,
            looping: false,
            last_dimensions: None,
        })
    }

    /// Restart from the first image instead of ending the stream.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of images in the sequence.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, CastError> {
        if self.cursor >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            debug!("image sequence wrapped");
            self.cursor = 0;
        }

        let path = self.paths[self.cursor].clone();
        self.cursor += 1;

        let decoded = tokio::task::spawn_blocking(move || {
            image::open(&path).map_err(|e| CastError::Source(format!("{}: {e}", path.display())))
        })
        .await
        .map_err(|e| CastError::Source(format!("decode task failed: {e}")))??;

        let frame = Frame::from(decoded.into_rgb8());
        self.last_dimensions = Some(frame.dimensions());
        Ok(Some(frame))
    }

    fn frame_dimensions(&self) -> Option<(u32, u32)> {
        self.last_dimensions
    }
}

// ── TestPatternSource ────────────────────────────────────────────

/// Synthetic source producing a scrolling colour gradient.
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    limit: Option<u64>,
    produced: u64,
}

impl TestPatternSource {
    /// Unbounded source of `width × height` frames (each at least 1).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            limit: None,
            produced: 0,
        }
    }

    /// End the stream after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Frames produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

#[async_trait]
impl FrameSource for TestPatternSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, CastError> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        let offset = (self.produced % 256) as u32;
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                ((x + offset) % 256) as u8,
                ((y + offset) % 256) as u8,
                (((x + y) / 2) % 256) as u8,
            ])
        });
        self.produced += 1;
        Ok(Some(Frame::from(image)))
    }

    fn frame_dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([10, 20, 30]))
            .save(dir.join(name))
            .unwrap();
    }

    #[tokio::test]
    async fn pattern_source_honours_limit() {
        let mut src = TestPatternSource::new(16, 8).with_limit(2);
        assert_eq!(src.frame_dimensions(), Some((16, 8)));
        assert!(src.next_frame().await.unwrap().is_some());
        let second = src.next_frame().await.unwrap().unwrap();
        assert_eq!(second.dimensions(), (16, 8));
        assert!(src.next_frame().await.unwrap().is_none());
        assert_eq!(src.produced(), 2);
    }

    #[tokio::test]
    async fn pattern_frames_move() {
        let mut src = TestPatternSource::new(8, 8);
        let a = src.next_frame().await.unwrap().unwrap();
        let b = src.next_frame().await.unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn sequence_plays_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 4, 4);
        write_image(dir.path(), "a.png", 6, 2);
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let mut src = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(src.frame_dimensions(), None);

        let first = src.next_frame().await.unwrap().unwrap();
        assert_eq!(first.dimensions(), (6, 2));
        assert_eq!(&first.as_raw()[..3], &[10, 20, 30]);
        assert_eq!(src.frame_dimensions(), Some((6, 2)));

        let second = src.next_frame().await.unwrap().unwrap();
        assert_eq!(second.dimensions(), (4, 4));
        assert!(src.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sequence_loops() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "only.png", 3, 3);

        let mut src = ImageSequenceSource::open(dir.path()).unwrap().looping(true);
        for _ in 0..3 {
            assert!(src.next_frame().await.unwrap().is_some());
        }
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSequenceSource::open(dir.path()).unwrap_err();
        assert!(matches!(err, CastError::Source(_)));
    }

    #[tokio::test]
    async fn corrupt_image_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let mut src = ImageSequenceSource::open(dir.path()).unwrap();
        let err = src.next_frame().await.unwrap_err();
        assert!(matches!(err, CastError::Source(_)));
        assert!(!err.is_skippable());
    }
}
