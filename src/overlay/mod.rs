//! # Overlay Module
//!
//! Composites the telemetry indicator onto video frames.
//!
//! This module handles:
//! - Gauge geometry and colour bands ([`gauge`])
//! - The label bitmap font ([`font`])
//! - Frame rendering ([`renderer`])

pub mod font;
pub mod gauge;
pub mod renderer;

pub use renderer::OverlayRenderer;

use image::{Rgb, RgbImage};

/// Set one pixel, ignoring coordinates outside the image.
pub(crate) fn put_pixel_clipped(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    if let Some(pixel) = image.get_pixel_mut_checked(x as u32, y as u32) {
        *pixel = color;
    }
}

/// Fill an inclusive rectangle, clipped to the image.
pub(crate) fn fill_rect(image: &mut RgbImage, rect: &gauge::Rect, color: Rgb<u8>) {
    let right = rect.right.min(i64::from(image.width()) - 1);
    let bottom = rect.bottom.min(i64::from(image.height()) - 1);

    for y in rect.top.max(0)..=bottom {
        for x in rect.left.max(0)..=right {
            put_pixel_clipped(image, x, y, color);
        }
    }
}
