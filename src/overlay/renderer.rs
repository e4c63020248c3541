//! # Overlay Renderer
//!
//! Draws the battery gauge onto a copy of a video frame.
//!
//! Rendering is a pure function of the frame and the telemetry snapshot it is
//! given. It never waits for telemetry; a stale snapshot is drawn as is.

use image::imageops::{self, FilterType};
use image::RgbImage;

use super::font;
use super::gauge::{OverlaySpec, LABEL_COLOR, OUTLINE_COLOR};
use super::fill_rect;
use crate::config::VideoConfig;
use crate::telemetry::TelemetrySnapshot;

/// Composites telemetry onto frames of a fixed output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRenderer {
    width: u32,
    height: u32,
}

impl OverlayRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(config.width, config.height)
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Return a new frame, scaled to the output size if needed, with the
    /// gauge for `snapshot` drawn on it.
    pub fn render(&self, frame: &RgbImage, snapshot: &TelemetrySnapshot) -> RgbImage {
        let mut output = if frame.dimensions() == (self.width, self.height) {
            frame.clone()
        } else {
            imageops::resize(frame, self.width, self.height, FilterType::Triangle)
        };

        let spec = OverlaySpec::new(self.width, self.height, snapshot.battery);
        draw_gauge(&mut output, &spec, label_scale(self.width));
        output
    }
}

/// Label glyph scale for an output width.
fn label_scale(width: u32) -> u32 {
    (width / 640).clamp(1, 3)
}

fn draw_gauge(image: &mut RgbImage, spec: &OverlaySpec, scale: u32) {
    fill_rect(image, &spec.body, OUTLINE_COLOR);
    fill_rect(image, &spec.terminal, OUTLINE_COLOR);
    for segment in &spec.segments {
        fill_rect(image, segment, spec.segment_color);
    }
    font::draw_text(image, spec.label_origin, &spec.label, LABEL_COLOR, scale);
}
