//! # Controller Input Mapper Module
//!
//! Applies [`RawInputSample`]s to a structured [`ControllerState`].
//!
//! ## Logical Channels
//!
//! | Channel | Kind | Range after mapping | Use |
//! |---------|------|---------------------|-----|
//! | LeftStickX | stick | -100..100 | Yaw |
//! | LeftStickY | stick | -100..100 | Vertical |
//! | RightStickX | stick | -100..100 | Lateral |
//! | RightStickY | stick | -100..100 | Forward/back |
//! | LeftTrigger / RightTrigger | trigger | 0..100 | unused |
//! | Start | button | level | Takeoff / land toggle |
//! | everything else | button | level | unused |
//!
//! Stick Y channels are positive when pushed up. Translating device codes
//! (and their sign conventions) into channels is the device's job; the mapper
//! only scales and filters.

use super::normalize::{
    normalize_filtered, DEFAULT_NOISE_THRESHOLD, STICK_MAX_MAGNITUDE, TRIGGER_MAX_MAGNITUDE,
};

/// A logical controller input, independent of the device's event codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    LeftTrigger,
    RightTrigger,
    DpadX,
    DpadY,
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    LeftThumb,
    RightThumb,
    Back,
    Start,
}

/// How a channel's raw reading is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Signed analog axis, scaled against the stick magnitude.
    Stick,
    /// Unsigned analog axis, scaled against the trigger magnitude.
    Trigger,
    /// Three-position hat reporting -1, 0 or 1.
    Hat,
    /// Digital level, nonzero while held.
    Button,
}

impl Channel {
    #[must_use]
    pub fn kind(self) -> ChannelKind {
        match self {
            Channel::LeftStickX | Channel::LeftStickY | Channel::RightStickX | Channel::RightStickY => {
                ChannelKind::Stick
            }
            Channel::LeftTrigger | Channel::RightTrigger => ChannelKind::Trigger,
            Channel::DpadX | Channel::DpadY => ChannelKind::Hat,
            _ => ChannelKind::Button,
        }
    }
}

/// One hardware event: which channel changed and its raw reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputSample {
    pub channel: Channel,
    pub value: i32,
}

impl RawInputSample {
    #[must_use]
    pub fn new(channel: Channel, value: i32) -> Self {
        Self { channel, value }
    }
}

/// Complete, normalized state of the game controller.
///
/// Analog values are already scaled to `[-100, 100]` (triggers `[0, 100]`)
/// with the dead zone applied. Buttons hold their current level; edge
/// detection is left to consumers.
///
/// # Examples
///
/// ```
/// use drone_hud::controller::mapper::ControllerState;
///
/// let state = ControllerState::default();
/// assert_eq!(state.right_stick_x, 0);
/// assert!(!state.btn_start);
/// assert!(state.is_neutral());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    // Analog sticks (-100..100, 0 = centered, up/right positive)
    pub left_stick_x: i32,
    pub left_stick_y: i32,
    pub right_stick_x: i32,
    pub right_stick_y: i32,

    // Triggers (0..100)
    pub left_trigger: i32,
    pub right_trigger: i32,

    // D-Pad (-1, 0, 1)
    pub dpad_x: i32,
    pub dpad_y: i32,

    // Face buttons
    pub btn_a: bool,
    pub btn_b: bool,
    pub btn_x: bool,
    pub btn_y: bool,

    // Shoulder buttons
    pub btn_left_bumper: bool,
    pub btn_right_bumper: bool,

    // Stick clicks
    pub btn_left_thumb: bool,
    pub btn_right_thumb: bool,

    // System buttons
    pub btn_back: bool,
    /// Start button (takeoff / land toggle).
    pub btn_start: bool,

    /// False while the device is failing to deliver events. Values above are
    /// then frozen at the last known reading.
    pub connected: bool,

    /// Incremented on every applied batch.
    pub sequence: u64,
}

impl Default for ControllerState {
    /// All sticks centered, buttons released, device assumed connected.
    fn default() -> Self {
        Self {
            left_stick_x: 0,
            left_stick_y: 0,
            right_stick_x: 0,
            right_stick_y: 0,
            left_trigger: 0,
            right_trigger: 0,
            dpad_x: 0,
            dpad_y: 0,
            btn_a: false,
            btn_b: false,
            btn_x: false,
            btn_y: false,
            btn_left_bumper: false,
            btn_right_bumper: false,
            btn_left_thumb: false,
            btn_right_thumb: false,
            btn_back: false,
            btn_start: false,
            connected: true,
            sequence: 0,
        }
    }
}

impl ControllerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when all four flight sticks are inside the dead zone.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.left_stick_x == 0
            && self.left_stick_y == 0
            && self.right_stick_x == 0
            && self.right_stick_y == 0
    }
}

/// Scaling parameters for [`EventMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisScale {
    pub stick_max: i32,
    pub trigger_max: i32,
    pub noise_threshold: i32,
}

impl Default for AxisScale {
    fn default() -> Self {
        Self {
            stick_max: STICK_MAX_MAGNITUDE,
            trigger_max: TRIGGER_MAX_MAGNITUDE,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

/// Accumulates raw samples into a [`ControllerState`].
///
/// Not thread-safe; owned by the input poller task, which publishes copies.
///
/// # Examples
///
/// ```
/// use drone_hud::controller::mapper::{Channel, EventMapper, RawInputSample};
///
/// let mut mapper = EventMapper::default();
/// mapper.apply_batch(&[RawInputSample::new(Channel::RightStickX, 16384)]);
/// assert_eq!(mapper.state().right_stick_x, 50);
/// ```
#[derive(Debug, Default)]
pub struct EventMapper {
    scale: AxisScale,
    state: ControllerState,
}

impl EventMapper {
    #[must_use]
    pub fn new(scale: AxisScale) -> Self {
        Self {
            scale,
            state: ControllerState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Applies every sample of one device batch and bumps the sequence number.
    pub fn apply_batch(&mut self, batch: &[RawInputSample]) {
        for sample in batch {
            self.apply(sample);
        }
        self.state.connected = true;
        self.state.sequence = self.state.sequence.wrapping_add(1);
    }

    /// Marks the device as disconnected, keeping the last known values.
    pub fn mark_disconnected(&mut self) {
        self.state.connected = false;
    }

    /// Updates exactly the one channel named by `sample`.
    pub fn apply(&mut self, sample: &RawInputSample) {
        let value = match sample.channel.kind() {
            ChannelKind::Stick => {
                normalize_filtered(sample.value, self.scale.stick_max, self.scale.noise_threshold)
            }
            ChannelKind::Trigger => {
                normalize_filtered(sample.value, self.scale.trigger_max, self.scale.noise_threshold).max(0)
            }
            ChannelKind::Hat => sample.value.signum(),
            ChannelKind::Button => i32::from(sample.value != 0),
        };
        let pressed = value != 0;

        let s = &mut self.state;
        match sample.channel {
            Channel::LeftStickX => s.left_stick_x = value,
            Channel::LeftStickY => s.left_stick_y = value,
            Channel::RightStickX => s.right_stick_x = value,
            Channel::RightStickY => s.right_stick_y = value,
            Channel::LeftTrigger => s.left_trigger = value,
            Channel::RightTrigger => s.right_trigger = value,
            Channel::DpadX => s.dpad_x = value,
            Channel::DpadY => s.dpad_y = value,
            Channel::A => s.btn_a = pressed,
            Channel::B => s.btn_b = pressed,
            Channel::X => s.btn_x = pressed,
            Channel::Y => s.btn_y = pressed,
            Channel::LeftBumper => s.btn_left_bumper = pressed,
            Channel::RightBumper => s.btn_right_bumper = pressed,
            Channel::LeftThumb => s.btn_left_thumb = pressed,
            Channel::RightThumb => s.btn_right_thumb = pressed,
            Channel::Back => s.btn_back = pressed,
            Channel::Start => s.btn_start = pressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(channel: Channel, value: i32) -> RawInputSample {
        RawInputSample::new(channel, value)
    }

    // ==================== ControllerState Tests ====================

    #[test]
    fn test_controller_state_default() {
        let state = ControllerState::default();
        assert!(state.is_neutral());
        assert!(!state.btn_start);
        assert!(!state.btn_a);
        assert!(state.connected);
        assert_eq!(state.sequence, 0);
        assert_eq!(state.left_trigger, 0);
        assert_eq!(state.dpad_x, 0);
    }

    #[test]
    fn test_is_neutral_per_stick() {
        for channel in [
            Channel::LeftStickX,
            Channel::LeftStickY,
            Channel::RightStickX,
            Channel::RightStickY,
        ] {
            let mut mapper = EventMapper::default();
            mapper.apply(&sample(channel, 20000));
            assert!(!mapper.state().is_neutral(), "{:?} should break neutral", channel);
        }
    }

    #[test]
    fn test_triggers_do_not_break_neutral() {
        let mut mapper = EventMapper::default();
        mapper.apply(&sample(Channel::LeftTrigger, 200));
        assert!(mapper.state().is_neutral());
    }

    // ==================== EventMapper Tests ====================

    #[test]
    fn test_right_stick_x_half_deflection() {
        let mut mapper = EventMapper::default();
        mapper.apply_batch(&[sample(Channel::RightStickX, 16384)]);
        assert_eq!(mapper.state().right_stick_x, 50);
    }

    #[test]
    fn test_stick_noise_filtered() {
        let mut mapper = EventMapper::default();
        // ~10% deflection is resting noise
        mapper.apply(&sample(Channel::LeftStickY, 3300));
        assert_eq!(mapper.state().left_stick_y, 0);
    }

    #[test]
    fn test_stick_full_deflection() {
        let mut mapper = EventMapper::default();
        mapper.apply(&sample(Channel::LeftStickX, -32768));
        mapper.apply(&sample(Channel::RightStickY, 32767));
        assert_eq!(mapper.state().left_stick_x, -100);
        assert_eq!(mapper.state().right_stick_y, 99);
    }

    #[test]
    fn test_trigger_scaled_with_trigger_magnitude() {
        let mut mapper = EventMapper::default();
        mapper.apply(&sample(Channel::RightTrigger, 128));
        assert_eq!(mapper.state().right_trigger, 50);
    }

    #[test]
    fn test_custom_trigger_magnitude() {
        let mut mapper = EventMapper::new(AxisScale {
            trigger_max: 1024,
            ..AxisScale::default()
        });
        mapper.apply(&sample(Channel::LeftTrigger, 1023));
        assert_eq!(mapper.state().left_trigger, 99);
    }

    #[test]
    fn test_dpad_is_signum() {
        let mut mapper = EventMapper::default();
        mapper.apply(&sample(Channel::DpadX, -1));
        mapper.apply(&sample(Channel::DpadY, 1));
        assert_eq!(mapper.state().dpad_x, -1);
        assert_eq!(mapper.state().dpad_y, 1);
    }

    #[test]
    fn test_button_levels() {
        let mut mapper = EventMapper::default();
        mapper.apply(&sample(Channel::Start, 1));
        assert!(mapper.state().btn_start);

        // Autorepeat (value 2) still counts as held
        mapper.apply(&sample(Channel::Start, 2));
        assert!(mapper.state().btn_start);

        mapper.apply(&sample(Channel::Start, 0));
        assert!(!mapper.state().btn_start);
    }

    #[test]
    fn test_each_button_maps_to_one_field() {
        let buttons = [
            Channel::A,
            Channel::B,
            Channel::X,
            Channel::Y,
            Channel::LeftBumper,
            Channel::RightBumper,
            Channel::LeftThumb,
            Channel::RightThumb,
            Channel::Back,
            Channel::Start,
        ];
        for channel in buttons {
            let mut mapper = EventMapper::default();
            mapper.apply(&sample(channel, 1));
            assert_ne!(*mapper.state(), ControllerState::default(), "{:?} should register", channel);
            assert!(mapper.state().is_neutral());
        }
    }

    #[test]
    fn test_single_sample_updates_one_channel() {
        let mut mapper = EventMapper::default();
        mapper.apply(&sample(Channel::LeftStickX, 20000));
        let before = *mapper.state();

        mapper.apply(&sample(Channel::RightStickY, -20000));
        let after = *mapper.state();

        assert_eq!(after.left_stick_x, before.left_stick_x);
        assert_eq!(after.right_stick_y, normalize_filtered(-20000, STICK_MAX_MAGNITUDE, DEFAULT_NOISE_THRESHOLD));
    }

    #[test]
    fn test_apply_batch_bumps_sequence_and_reconnects() {
        let mut mapper = EventMapper::default();
        mapper.mark_disconnected();
        assert!(!mapper.state().connected);

        mapper.apply_batch(&[sample(Channel::A, 1)]);
        assert!(mapper.state().connected);
        assert_eq!(mapper.state().sequence, 1);
    }

    #[test]
    fn test_disconnect_keeps_values() {
        let mut mapper = EventMapper::default();
        mapper.apply_batch(&[sample(Channel::RightStickX, 30000)]);
        mapper.mark_disconnected();
        assert_eq!(mapper.state().right_stick_x, 91);
    }
}
