//! Minimal 5x7 bitmap font for the gauge label.
//!
//! Covers the digits, `%`, `-` and space. Anything else advances the cursor
//! without drawing.

use image::{Rgb, RgbImage};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;

/// Horizontal distance between glyph origins, before scaling
const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Row bitmaps, top row first; bit 4 is the leftmost column.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
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
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ' ' => [0x00; 7],
        _ => return None,
    };
    Some(rows)
}

/// Draw `text` with its baseline at `origin.1`, clipping at the image edges.
pub fn draw_text(image: &mut RgbImage, origin: (i64, i64), text: &str, color: Rgb<u8>, scale: u32) {
    let scale = i64::from(scale.max(1));
    let top = origin.1 - i64::from(GLYPH_HEIGHT) * scale;
    let mut left = origin.0;

    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (0x10 >> col) == 0 {
                        continue;
                    }
                    let x = left + i64::from(col) * scale;
                    let y = top + row as i64 * scale;
                    fill_block(image, x, y, scale, color);
                }
            }
        }
        left += i64::from(ADVANCE) * scale;
    }
}

fn fill_block(image: &mut RgbImage, x: i64, y: i64, size: i64, color: Rgb<u8>) {
    for dy in 0..size {
        for dx in 0..size {
            super::put_pixel_clipped(image, x + dx, y + dy, color);
        }
    }
}
