//! Detection overlays.
//!
//! [`ResultRenderer`] is the seam between the pipeline and whatever draws
//! results. [`BoxRenderer`] paints box outlines and a labelled bar per
//! prediction directly into the RGB8 frame. Class colours come from a
//! hash of the label, so the same class is always drawn the same colour.

use image::{Rgb, RgbImage};

use crate::protocol::prediction::{self, Prediction};
use crate::stream::font::{self, GLYPH_HEIGHT};
use crate::stream::types::Frame;

/// Label text colour.
pub const LABEL_TEXT: Rgb<u8> = Rgb([255, 255, 255]);
/// Colour of [`draw_overlay`] lines.
pub const OVERLAY_TEXT: Rgb<u8> = Rgb([0, 255, 0]);

/// Padding between the label bar edge and its text.
const LABEL_PAD: i64 = 2;
/// Vertical distance between overlay lines.
const OVERLAY_LINE_STEP: i64 = GLYPH_HEIGHT as i64 + 4;

// ── ResultRenderer ───────────────────────────────────────────────

/// Draws predictions onto frames and describes them in text.
pub trait ResultRenderer {
    /// Return `frame` with `predictions` drawn on it.
    fn annotate(&self, frame: Frame, predictions: &[Prediction]) -> Frame;

    /// Human-readable description of `predictions`.
    fn summarize(&self, predictions: &[Prediction]) -> String {
        prediction::summarize(predictions)
    }
}

// ── BoxRenderer ──────────────────────────────────────────────────

/// Outline-and-label renderer.
#[derive(Debug, Clone)]
pub struct BoxRenderer {
    thickness: u32,
    label_height: u32,
}

impl BoxRenderer {
    pub fn new() -> Self {
        Self {
            thickness: 2,
            label_height: 12,
        }
    }

    /// Override the outline thickness (at least 1 pixel).
    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness.max(1);
        self
    }

    fn draw(&self, image: &mut RgbImage, p: &Prediction) {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let (max_x, max_y) = (i64::from(w) - 1, i64::from(h) - 1);
        let (x1, y1, x2, y2) = p.pixel_box(w, h);
        if x2 < 0 || y2 < 0 || x1 > max_x || y1 > max_y || x1 > x2 || y1 > y2 {
            return;
        }
        let (x1, y1) = (x1.clamp(0, max_x), y1.clamp(0, max_y));
        let (x2, y2) = (x2.clamp(0, max_x), y2.clamp(0, max_y));
        let color = class_color(&p.class_name);

        // Edges never extend past the opposite side of a thin box.
        let t = i64::from(self.thickness) - 1;
        fill_rect(image, x1, y1, x2, (y1 + t).min(y2), color);
        fill_rect(image, x1, y1.max(y2 - t), x2, y2, color);
        fill_rect(image, x1, y1, (x1 + t).min(x2), y2, color);
        fill_rect(image, x1.max(x2 - t), y1, x2, y2, color);

        // Label bar sits above the box, pushed down if it would leave the frame.
        let label = p.label();
        let label_h = i64::from(self.label_height);
        let label_w = i64::from(font::text_width(&label)) + 2 * LABEL_PAD;
        let bar_bottom = y1.max(label_h);
        let bar_top = bar_bottom - label_h;
        fill_rect(image, x1, bar_top, x1 + label_w, bar_bottom, color);

        let text_top = bar_top + (label_h + 1 - i64::from(GLYPH_HEIGHT)) / 2;
        font::draw_text(image, x1 + LABEL_PAD, text_top, &label, LABEL_TEXT);
    }
}

impl Default for BoxRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultRenderer for BoxRenderer {
    fn annotate(&self, mut frame: Frame, predictions: &[Prediction]) -> Frame {
        for p in predictions {
            self.draw(frame.image_mut(), p);
        }
        frame
    }
}

/// Draw `lines` top-down in the upper-left corner of `frame`.
pub fn draw_overlay<S: AsRef<str>>(frame: &mut Frame, lines: &[S]) {
    let image = frame.image_mut();
    for (i, line) in lines.iter().enumerate() {
        let y = 4 + i as i64 * OVERLAY_LINE_STEP;
        font::draw_text(image, 4, y, line.as_ref(), OVERLAY_TEXT);
    }
}

/// Stable colour for a class label.
pub fn class_color(class_name: &str) -> Rgb<u8> {
    let hash = blake3::hash(class_name.as_bytes());
    let b = hash.as_bytes();
    Rgb([b[0], b[1], b[2]])
}

/// Fill the inclusive rectangle `(x0, y0)..=(x1, y1)`, clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    let x_start = x0.max(0);
    let y_start = y0.max(0);
    let x_end = x1.min(i64::from(w) - 1);
    let y_end = y1.min(i64::from(h) - 1);
    if x_start > x_end || y_start > y_end {
        return;
    }
    for y in y_start..=y_end {
        for x in x_start..=x_end {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 3] = [0, 0, 0];

    fn pred(x: f32, y: f32, w: f32, h: f32, class: &str) -> Prediction {
        Prediction {
            x,
            y,
            width: w,
            height: h,
            class_name: class.into(),
            confidence: 0.75,
        }
    }

    #[test]
    fn no_predictions_leaves_frame_untouched() {
        let frame = Frame::filled(40, 30, [9, 9, 9]);
        let out = BoxRenderer::new().annotate(frame.clone(), &[]);
        assert_eq!(out, frame);
    }

    #[test]
    fn draws_outline_and_label_bar() {
        let frame = Frame::filled(100, 100, BLACK);
        let p = pred(0.5, 0.5, 0.5, 0.5, "person");
        let out = BoxRenderer::new().annotate(frame, std::slice::from_ref(&p));
        let img = out.image();
        let color = class_color("person");

        // Left edge spans x = 25..=26.
        assert_eq!(*img.get_pixel(25, 50), color);
        assert_eq!(*img.get_pixel(26, 50), color);
        // Interior untouched.
        assert_eq!(*img.get_pixel(50, 50), Rgb(BLACK));
        // Label bar above the top edge.
        assert_eq!(*img.get_pixel(30, 15), color);
    }

    #[test]
    fn label_bar_clamped_at_top() {
        let frame = Frame::filled(100, 100, BLACK);
        let p = pred(0.5, 0.05, 0.4, 0.1, "car");
        let out = BoxRenderer::new().annotate(frame, &[p]);
        // Box top is y = 0, so the bar is pushed down to rows 0..=12.
        // Column 30 is edge or bar padding, left of the first glyph.
        assert_eq!(*out.image().get_pixel(30, 6), class_color("car"));
    }

    #[test]
    fn label_text_is_drawn_over_the_bar() {
        let frame = Frame::filled(200, 100, BLACK);
        let p = Prediction {
            confidence: 0.91,
            ..pred(0.5, 0.6, 0.4, 0.4, "person")
        };
        let out = BoxRenderer::new().annotate(frame, &[p.clone()]);
        let img = out.image();
        let color = class_color("person");

        // Box top at y = 40, so the bar covers rows 28..=40 from x = 60.
        let bar_w = font::text_width(&p.label()) + 4;
        let mut text = 0;
        let mut bar = 0;
        for y in 28..=40 {
            for x in 60..=60 + bar_w {
                match *img.get_pixel(x, y) {
                    c if c == LABEL_TEXT => text += 1,
                    c if c == color => bar += 1,
                    _ => {}
                }
            }
        }
        assert!(text > 0, "no label glyphs in the bar");
        assert!(bar > text);
    }

    #[test]
    fn thin_box_edges_stay_inside() {
        let frame = Frame::filled(100, 100, BLACK);
        // One pixel wide: x1 = x2 = 50 with thickness 2.
        let p = pred(0.5, 0.5, 0.0, 0.4, "pole");
        let out = BoxRenderer::new().annotate(frame, &[p]);
        let img = out.image();
        assert_eq!(*img.get_pixel(50, 50), class_color("pole"));
        assert_eq!(*img.get_pixel(49, 50), Rgb(BLACK));
        assert_eq!(*img.get_pixel(51, 50), Rgb(BLACK));
    }

    #[test]
    fn overlay_lines_are_drawn() {
        let mut frame = Frame::filled(120, 40, BLACK);
        draw_overlay(&mut frame, &["frames_sent_total: 3", "avg_latency: 1.00 ms"]);
        let rows_lit = |range: std::ops::Range<u32>| {
            range
                .flat_map(|y| (0..120).map(move |x| (x, y)))
                .any(|(x, y)| *frame.image().get_pixel(x, y) == OVERLAY_TEXT)
        };
        assert!(rows_lit(4..11));
        assert!(rows_lit(15..22));
        assert!(!rows_lit(30..40));
    }

    #[test]
    fn off_frame_box_is_ignored() {
        let frame = Frame::filled(20, 20, BLACK);
        let out = BoxRenderer::new().annotate(frame.clone(), &[pred(3.0, 3.0, 0.2, 0.2, "x")]);
        assert_eq!(out, frame);
    }

    #[test]
    fn partially_visible_box_is_clipped() {
        let frame = Frame::filled(20, 20, BLACK);
        let out = BoxRenderer::new().annotate(frame, &[pred(1.0, 0.5, 0.5, 0.5, "edge")]);
        // x1 = 15, x2 clamps to 19.
        assert_eq!(*out.image().get_pixel(19, 10), class_color("edge"));
    }

    #[test]
    fn colours_are_deterministic() {
        assert_eq!(class_color("person"), class_color("person"));
        assert_ne!(class_color("person"), class_color("bicycle"));
    }

    #[test]
    fn default_summary() {
        let r = BoxRenderer::new();
        assert_eq!(r.summarize(&[]), "No predictions");
        assert_eq!(
            r.summarize(&[pred(0.1, 0.1, 0.1, 0.1, "cat")]),
            "Found 1 objects: 1 cat"
        );
    }
}
