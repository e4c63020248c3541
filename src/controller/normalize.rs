//! # Input Normalization
//!
//! Pure functions that turn raw device readings into the controller's signed
//! percentage range `[-100, 100]`, plus the dead-zone filter applied to every
//! analog channel.
//!
//! ## Value Ranges
//!
//! - Stick axes: signed 16-bit, magnitude 2^15
//! - Triggers: 8-bit, magnitude 2^8
//! - Output: -100 (full negative) to 100 (full positive), 0 at rest

/// Maximum magnitude of a stick axis reading (2^15).
pub const STICK_MAX_MAGNITUDE: i32 = 1 << 15;

/// Maximum magnitude of a trigger reading (2^8).
pub const TRIGGER_MAX_MAGNITUDE: i32 = 1 << 8;

/// Largest normalized value.
pub const NORMALIZED_MAX: i32 = 100;

/// Smallest normalized value.
pub const NORMALIZED_MIN: i32 = -100;

/// Resting sticks report up to this much noise after normalization.
pub const DEFAULT_NOISE_THRESHOLD: i32 = 15;

/// Scales a raw reading against its maximum magnitude into `[-100, 100]`.
///
/// Rounds toward zero. Readings beyond `max_magnitude` clamp to the range
/// ends, and a non-positive `max_magnitude` yields 0.
///
/// # Examples
///
/// ```
/// use drone_hud::controller::normalize::{normalize, STICK_MAX_MAGNITUDE};
///
/// assert_eq!(normalize(16384, STICK_MAX_MAGNITUDE), 50);
/// assert_eq!(normalize(-STICK_MAX_MAGNITUDE, STICK_MAX_MAGNITUDE), -100);
/// assert_eq!(normalize(32767, STICK_MAX_MAGNITUDE), 99);
/// ```
#[must_use]
pub fn normalize(raw: i32, max_magnitude: i32) -> i32 {
    if max_magnitude <= 0 {
        return 0;
    }

    // i64 so that raw * 100 cannot overflow for any i32 reading
    let scaled = i64::from(raw) * i64::from(NORMALIZED_MAX) / i64::from(max_magnitude);
    scaled.clamp(i64::from(NORMALIZED_MIN), i64::from(NORMALIZED_MAX)) as i32
}

/// Dead-zone filter: values within `threshold` of rest become 0, anything
/// else passes through unchanged.
///
/// # Examples
///
/// ```
/// use drone_hud::controller::normalize::{filter_noise, DEFAULT_NOISE_THRESHOLD};
///
/// assert_eq!(filter_noise(15, DEFAULT_NOISE_THRESHOLD), 0);
/// assert_eq!(filter_noise(-16, DEFAULT_NOISE_THRESHOLD), -16);
/// ```
#[must_use]
pub fn filter_noise(value: i32, threshold: i32) -> i32 {
    if value.abs() <= threshold {
        0
    } else {
        value
    }
}

/// [`normalize`] followed by [`filter_noise`].
#[must_use]
pub fn normalize_filtered(raw: i32, max_magnitude: i32, threshold: i32) -> i32 {
    filter_noise(normalize(raw, max_magnitude), threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoints() {
        assert_eq!(normalize(STICK_MAX_MAGNITUDE, STICK_MAX_MAGNITUDE), 100);
        assert_eq!(normalize(-STICK_MAX_MAGNITUDE, STICK_MAX_MAGNITUDE), -100);
        assert_eq!(normalize(0, STICK_MAX_MAGNITUDE), 0);
    }

    #[test]
    fn test_normalize_trigger_endpoints() {
        assert_eq!(normalize(TRIGGER_MAX_MAGNITUDE, TRIGGER_MAX_MAGNITUDE), 100);
        assert_eq!(normalize(255, TRIGGER_MAX_MAGNITUDE), 99);
        assert_eq!(normalize(128, TRIGGER_MAX_MAGNITUDE), 50);
    }

    #[test]
    fn test_normalize_half_deflection() {
        assert_eq!(normalize(16384, STICK_MAX_MAGNITUDE), 50);
        assert_eq!(normalize(-16384, STICK_MAX_MAGNITUDE), -50);
    }

    #[test]
    fn test_normalize_rounds_toward_zero() {
        // 327 * 100 / 32768 = 0.998
        assert_eq!(normalize(327, STICK_MAX_MAGNITUDE), 0);
        assert_eq!(normalize(-327, STICK_MAX_MAGNITUDE), 0);
        // 32767 * 100 / 32768 = 99.997
        assert_eq!(normalize(32767, STICK_MAX_MAGNITUDE), 99);
        assert_eq!(normalize(-32767, STICK_MAX_MAGNITUDE), -99);
    }

    #[test]
    fn test_normalize_clamps_out_of_range() {
        assert_eq!(normalize(i32::MAX, STICK_MAX_MAGNITUDE), 100);
        assert_eq!(normalize(i32::MIN, STICK_MAX_MAGNITUDE), -100);
        assert_eq!(normalize(1000, TRIGGER_MAX_MAGNITUDE), 100);
    }

    #[test]
    fn test_normalize_invalid_magnitude() {
        assert_eq!(normalize(1000, 0), 0);
        assert_eq!(normalize(1000, -5), 0);
    }

    #[test]
    fn test_normalize_is_monotonic() {
        let mut previous = normalize(-STICK_MAX_MAGNITUDE, STICK_MAX_MAGNITUDE);
        for raw in (-STICK_MAX_MAGNITUDE..=STICK_MAX_MAGNITUDE).step_by(7) {
            let value = normalize(raw, STICK_MAX_MAGNITUDE);
            assert!(value >= previous, "normalize({}) = {} < {}", raw, value, previous);
            assert!((NORMALIZED_MIN..=NORMALIZED_MAX).contains(&value));
            previous = value;
        }
    }

    #[test]
    fn test_filter_noise_inside_dead_zone() {
        for v in -DEFAULT_NOISE_THRESHOLD..=DEFAULT_NOISE_THRESHOLD {
            assert_eq!(filter_noise(v, DEFAULT_NOISE_THRESHOLD), 0, "value {}", v);
        }
    }

    #[test]
    fn test_filter_noise_outside_dead_zone() {
        for v in (DEFAULT_NOISE_THRESHOLD + 1)..=100 {
            assert_eq!(filter_noise(v, DEFAULT_NOISE_THRESHOLD), v);
            assert_eq!(filter_noise(-v, DEFAULT_NOISE_THRESHOLD), -v);
        }
    }

    #[test]
    fn test_filter_noise_zero_threshold() {
        assert_eq!(filter_noise(0, 0), 0);
        assert_eq!(filter_noise(1, 0), 1);
    }

    #[test]
    fn test_normalize_filtered() {
        // 4915 / 32768 = 15% -> inside the dead zone
        assert_eq!(normalize_filtered(4915, STICK_MAX_MAGNITUDE, DEFAULT_NOISE_THRESHOLD), 0);
        assert_eq!(normalize_filtered(16384, STICK_MAX_MAGNITUDE, DEFAULT_NOISE_THRESHOLD), 50);
    }
}
