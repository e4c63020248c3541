//! # Battery Gauge Geometry
//!
//! Pure description of the battery indicator for a given frame size and
//! battery value. Nothing here touches pixels; the renderer paints whatever
//! [`OverlaySpec`] describes.
//!
//! ## Layout
//!
//! All coordinates are offsets from the anchor `(w / 128, h / 32)`:
//!
//! | Part | From | To |
//! |------|------|----|
//! | Body | (3, 29) | (52, 51) |
//! | Terminal cap | (52, 35) | (55, 45) |
//! | Segment `i` (1..=10) | (5i, 30) | (5i + 1, 50) |
//! | Label baseline | (60, 45) | |
//!
//! ## Bands
//!
//! | Battery | Colour |
//! |---------|--------|
//! | >= 70 % | Green |
//! | 40..=69 % | Yellow |
//! | < 40 % | Red |

use image::Rgb;

/// Segments in a full gauge
pub const MAX_SEGMENTS: u32 = 10;

/// Gauge body and terminal colour
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Percentage label colour
pub const LABEL_COLOR: Rgb<u8> = Rgb([255, 157, 43]);

/// Label shown before the first battery reading
pub const UNKNOWN_LABEL: &str = "-- %";

/// Colour band of a battery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryBand {
    Red,
    Yellow,
    Green,
}

impl BatteryBand {
    pub fn for_percent(percent: u8) -> Self {
        match percent {
            70..=u8::MAX => BatteryBand::Green,
            40..=69 => BatteryBand::Yellow,
            _ => BatteryBand::Red,
        }
    }

    pub fn color(self) -> Rgb<u8> {
        match self {
            BatteryBand::Green => Rgb([0, 255, 0]),
            BatteryBand::Yellow => Rgb([255, 255, 0]),
            BatteryBand::Red => Rgb([255, 0, 0]),
        }
    }
}

/// Number of lit segments: one per full 10 %, at least one, at most ten.
///
/// # Examples
///
/// ```
/// use drone_hud::overlay::gauge::segment_count;
///
/// assert_eq!(segment_count(100), 10);
/// assert_eq!(segment_count(75), 7);
/// assert_eq!(segment_count(5), 1);
/// ```
pub fn segment_count(percent: u8) -> u32 {
    (u32::from(percent) / 10).clamp(1, MAX_SEGMENTS)
}

/// Axis-aligned rectangle, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    fn offset(origin: (i64, i64), from: (i64, i64), to: (i64, i64)) -> Self {
        Self {
            left: origin.0 + from.0,
            top: origin.1 + from.1,
            right: origin.0 + to.0,
            bottom: origin.1 + to.1,
        }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }
}

/// Everything needed to draw the gauge on one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub body: Rect,
    pub terminal: Rect,
    pub segments: Vec<Rect>,
    pub segment_color: Rgb<u8>,
    pub label: String,
    /// Left end of the label baseline
    pub label_origin: (i64, i64),
}

impl OverlaySpec {
    /// Gauge for a `width` x `height` frame; `None` battery draws the outline
    /// and an unknown label only.
    pub fn new(width: u32, height: u32, battery: Option<u8>) -> Self {
        let origin = (i64::from(width / 128), i64::from(height / 32));

        let (segments, segment_color, label) = match battery {
            Some(percent) => {
                let percent = percent.min(100);
                let segments = (1..=i64::from(segment_count(percent)))
                    .map(|i| Rect::offset(origin, (5 * i, 30), (5 * i + 1, 50)))
                    .collect();
                let color = BatteryBand::for_percent(percent).color();
                (segments, color, format!("{} %", percent))
            }
            None => (Vec::new(), OUTLINE_COLOR, UNKNOWN_LABEL.to_string()),
        };

        Self {
            body: Rect::offset(origin, (3, 29), (52, 51)),
            terminal: Rect::offset(origin, (52, 35), (55, 45)),
            segments,
            segment_color,
            label,
            label_origin: (origin.0 + 60, origin.1 + 45),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_count_examples() {
        assert_eq!(segment_count(100), 10);
        assert_eq!(segment_count(75), 7);
        assert_eq!(segment_count(55), 5);
        assert_eq!(segment_count(25), 2);
        assert_eq!(segment_count(5), 1);
        assert_eq!(segment_count(0), 1);
        assert_eq!(segment_count(255), 10);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(BatteryBand::for_percent(100), BatteryBand::Green);
        assert_eq!(BatteryBand::for_percent(70), BatteryBand::Green);
        assert_eq!(BatteryBand::for_percent(69), BatteryBand::Yellow);
        assert_eq!(BatteryBand::for_percent(40), BatteryBand::Yellow);
        assert_eq!(BatteryBand::for_percent(39), BatteryBand::Red);
        assert_eq!(BatteryBand::for_percent(0), BatteryBand::Red);
    }

    #[test]
    fn test_segment_count_monotonic() {
        let mut previous = 0;
        for percent in 0..=100u8 {
            let count = segment_count(percent);
            assert!(count >= previous, "count dropped at {}%", percent);
            previous = count;
        }
    }

    #[test]
    fn test_geometry_at_720p() {
        let spec = OverlaySpec::new(1280, 720, Some(55));

        // Anchor is (10, 22)
        assert_eq!(spec.body, Rect { left: 13, top: 51, right: 62, bottom: 73 });
        assert_eq!(spec.terminal, Rect { left: 62, top: 57, right: 65, bottom: 67 });
        assert_eq!(spec.label_origin, (70, 67));
        assert_eq!(spec.label, "55 %");
        assert_eq!(spec.segment_color, BatteryBand::Yellow.color());

        assert_eq!(spec.segments.len(), 5);
        assert_eq!(spec.segments[0], Rect { left: 15, top: 52, right: 16, bottom: 72 });
        assert_eq!(spec.segments[4].left, 35);
    }

    #[test]
    fn test_segments_stay_inside_body() {
        let spec = OverlaySpec::new(720, 480, Some(100));
        for segment in &spec.segments {
            assert!(spec.body.contains(segment.left, segment.top));
            assert!(spec.body.contains(segment.right, segment.bottom));
        }
    }

    #[test]
    fn test_unknown_battery() {
        let spec = OverlaySpec::new(720, 480, None);
        assert!(spec.segments.is_empty());
        assert_eq!(spec.label, UNKNOWN_LABEL);
    }

    #[test]
    fn test_tiny_frame_anchors_at_origin() {
        let spec = OverlaySpec::new(64, 16, Some(50));
        assert_eq!(spec.body.left, 3);
        assert_eq!(spec.body.top, 29);
    }
}
