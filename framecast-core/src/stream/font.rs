//! Minimal 5×7 bitmap font for overlay text.
//!
//! Covers upper-case letters (lower case is folded), digits and the
//! punctuation used by labels and metric lines. Unknown characters render
//! as blank cells.

use image::{Rgb, RgbImage};

/// Glyph cell width in pixels.
pub const GLYPH_WIDTH: u32 = 5;
/// Glyph cell height in pixels.
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal distance between glyph origins.
pub const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Width in pixels of `text` when drawn with [`draw_text`].
pub fn text_width(text: &str) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 { 0 } else { n * GLYPH_ADVANCE - 1 }
}

/// Draw `text` with its top-left corner at `(x, y)`, clipped to the image.
pub fn draw_text(image: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let mut origin = x;
    for ch in text.chars().flat_map(char::to_uppercase) {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                let py = y + row as i64;
                if !(0..h).contains(&py) {
                    continue;
                }
                for col in 0..GLYPH_WIDTH {
                    if (*bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = origin + i64::from(col);
                    if (0..w).contains(&px) {
                        image.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
        origin += i64::from(GLYPH_ADVANCE);
    }
}

fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        _ => return None,
    };
    Some(rows)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn lit(image: &RgbImage) -> usize {
        image.pixels().filter(|p| **p == WHITE).count()
    }

    #[test]
    fn draws_known_glyph() {
        let mut img = RgbImage::new(8, 8);
        draw_text(&mut img, 0, 0, "I", WHITE);
        // Top bar of the I spans columns 1..=3.
        assert_eq!(*img.get_pixel(1, 0), WHITE);
        assert_eq!(*img.get_pixel(3, 0), WHITE);
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(2, 3), WHITE);
    }

    #[test]
    fn lower_case_folds_to_upper() {
        let mut upper = RgbImage::new(20, 8);
        let mut lower = RgbImage::new(20, 8);
        draw_text(&mut upper, 0, 0, "CAR", WHITE);
        draw_text(&mut lower, 0, 0, "car", WHITE);
        assert_eq!(upper, lower);
        assert!(lit(&upper) > 0);
    }

    #[test]
    fn unknown_and_space_are_blank() {
        let mut img = RgbImage::new(20, 8);
        draw_text(&mut img, 0, 0, " ~", WHITE);
        assert_eq!(lit(&img), 0);
    }

    #[test]
    fn clipped_at_edges() {
        let mut img = RgbImage::new(4, 4);
        draw_text(&mut img, -2, -3, "88", WHITE);
        draw_text(&mut img, 3, 3, "88", WHITE);
        assert!(lit(&img) > 0);
    }

    #[test]
    fn width_accounts_for_spacing() {
        assert_eq!(text_width(""), 0);
        assert_eq!(text_width("a"), 5);
        assert_eq!(text_width("ab"), 11);
    }
}
